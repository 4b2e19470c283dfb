//! `cancel <filename>` commands typed while a batch runs.

use std::io::BufRead;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::downloader::Downloader;
use crate::models::TransferId;
use crate::registry::CANCEL_ACTION;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Cancel(String),
    Blank,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Blank;
    }
    match line.split_once(char::is_whitespace) {
        Some(("cancel", filename)) if !filename.trim().is_empty() => {
            Command::Cancel(filename.trim().to_string())
        }
        _ => Command::Unknown(line.to_string()),
    }
}

/// Reads lines on a plain OS thread and forwards them. A read blocked there
/// never holds up runtime shutdown; the thread ends with the process.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::UnboundedReceiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = thread::Builder::new()
        .name("command-reader".into())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "stopped reading commands");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not start command reader");
    }
    rx
}

/// Applies commands until the input closes. Abort the surrounding task to
/// stop early.
pub async fn route_commands(mut lines: mpsc::UnboundedReceiver<String>, downloader: &Downloader) {
    while let Some(line) = lines.recv().await {
        match parse_command(&line) {
            Command::Cancel(filename) => {
                let id = TransferId::for_filename(&filename);
                if !downloader.handle_action(id.as_str(), CANCEL_ACTION) {
                    eprintln!("No active download named {}", filename);
                }
            }
            Command::Blank => {}
            Command::Unknown(other) => {
                eprintln!("Unknown command {:?}, try `cancel <filename>`", other)
            }
        }
    }
    debug!("command input closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::DownloadConfig;
    use crate::downloader::Collaborators;
    use crate::notify::LogNotifier;
    use crate::registry::CancelHandle;
    use crate::share::PrintShareSink;

    fn downloader() -> Downloader {
        let config = DownloadConfig::default();
        let client = reqwest::Client::new();
        let collaborators = Collaborators::local(
            &client,
            &config,
            Arc::new(LogNotifier),
            Arc::new(PrintShareSink),
        );
        Downloader::with_client(client, config, collaborators)
    }

    #[test]
    fn command_parsing() {
        assert_eq!(
            parse_command("  cancel  my file.pdf "),
            Command::Cancel("my file.pdf".into())
        );
        assert_eq!(parse_command(""), Command::Blank);
        assert_eq!(parse_command("cancel"), Command::Unknown("cancel".into()));
        assert_eq!(parse_command("stop a.pdf"), Command::Unknown("stop a.pdf".into()));
    }

    #[tokio::test]
    async fn cancel_lines_reach_the_registry() {
        let downloader = downloader();
        let handle = CancelHandle::new();
        downloader
            .registry()
            .register(TransferId::for_filename("a.pdf"), handle.clone())
            .unwrap();

        let lines = spawn_line_reader(Cursor::new("bogus\n\ncancel a.pdf\n"));
        route_commands(lines, &downloader).await;

        assert!(handle.is_cancelled());
        assert!(downloader.registry().is_empty());
    }

    #[tokio::test]
    async fn routing_stops_on_abort_while_input_stays_open() {
        let downloader = Arc::new(downloader());
        let (_tx, rx) = mpsc::unbounded_channel::<String>();

        let router = {
            let downloader = downloader.clone();
            tokio::spawn(async move { route_commands(rx, &downloader).await })
        };
        router.abort();

        let joined = tokio::time::timeout(Duration::from_secs(1), router)
            .await
            .expect("router did not stop after abort");
        assert!(joined.unwrap_err().is_cancelled());
    }
}
