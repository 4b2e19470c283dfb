//! Notification sink contract plus the sinks shipped with the CLI.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use crate::format::truncate;
use crate::registry::CANCEL_ACTION;

/// Fixed id of the batch summary notification.
pub const SUMMARY_ID: &str = "download-summary";
pub const DEFAULT_SOUND: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressIndicator {
    pub max: u8,
    pub current: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub id: String,
    pub title: String,
}

impl NotificationAction {
    pub fn cancel() -> Self {
        Self {
            id: CANCEL_ACTION.to_string(),
            title: "Cancel".to_string(),
        }
    }
}

/// One per-file notification update. Re-displaying with the same id replaces
/// the previous content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNotification {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressIndicator>,
    pub actions: Vec<NotificationAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
}

impl FileNotification {
    pub fn started(id: &str, filename: &str, width: usize) -> Self {
        Self {
            id: id.to_string(),
            title: format!("Downloading: {}", truncate(filename, width)),
            body: None,
            progress: None,
            actions: Vec::new(),
            sound: None,
        }
    }

    pub fn progress(id: &str, filename: &str, width: usize, percent: u8) -> Self {
        Self {
            id: id.to_string(),
            title: format!("Downloading: {} - {}%", truncate(filename, width), percent),
            body: None,
            progress: Some(ProgressIndicator {
                max: 100,
                current: percent,
            }),
            actions: vec![NotificationAction::cancel()],
            sound: None,
        }
    }

    pub fn complete(id: &str, filename: &str, width: usize) -> Self {
        Self {
            id: id.to_string(),
            title: truncate(filename, width),
            body: Some("Download complete.".to_string()),
            progress: None,
            actions: Vec::new(),
            sound: Some(DEFAULT_SOUND.to_string()),
        }
    }

    pub fn failed(id: &str, filename: &str, width: usize, reason: &str) -> Self {
        Self {
            id: id.to_string(),
            title: truncate(filename, width),
            body: Some(format!("Failed: {}", reason)),
            progress: None,
            actions: Vec::new(),
            sound: Some(DEFAULT_SOUND.to_string()),
        }
    }
}

/// Where user-visible download state goes. Calls are fire-and-forget.
pub trait Notifier: Send + Sync {
    fn display_summary(&self, id: &str, title: &str, body: Option<&str>);

    fn display_file_progress(&self, notification: &FileNotification);

    fn cancel_notification(&self, id: &str);
}

/// Only writes to the log. Used when notifications are not permitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn display_summary(&self, id: &str, title: &str, body: Option<&str>) {
        info!(id, title, body, "summary notification");
    }

    fn display_file_progress(&self, n: &FileNotification) {
        info!(
            id = %n.id,
            title = %n.title,
            body = n.body.as_deref(),
            percent = n.progress.map(|p| p.current),
            "file notification"
        );
    }

    fn cancel_notification(&self, id: &str) {
        info!(id, "notification dismissed");
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum NotificationEvent<'a> {
    Summary {
        id: &'a str,
        title: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<&'a str>,
    },
    File(&'a FileNotification),
    Cancel {
        id: &'a str,
    },
}

/// Emits one JSON object per line on stdout for a host process to render.
#[derive(Debug, Default)]
pub struct JsonNotifier {
    out: Mutex<()>,
}

impl JsonNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&self, event: &NotificationEvent<'_>) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to serialize notification");
                return;
            }
        };
        let _guard = self.out.lock().unwrap_or_else(|p| p.into_inner());
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line).and_then(|_| stdout.flush()) {
            warn!(error = %e, "failed to write notification");
        }
    }
}

impl Notifier for JsonNotifier {
    fn display_summary(&self, id: &str, title: &str, body: Option<&str>) {
        self.emit(&NotificationEvent::Summary { id, title, body });
    }

    fn display_file_progress(&self, notification: &FileNotification) {
        self.emit(&NotificationEvent::File(notification));
    }

    fn cancel_notification(&self, id: &str) {
        self.emit(&NotificationEvent::Cancel { id });
    }
}

/// Renders notifications as terminal progress bars: one line for the summary
/// and one per file.
pub struct TerminalNotifier {
    multi_progress: MultiProgress,
    summary: ProgressBar,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        let multi_progress = MultiProgress::new();
        multi_progress.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));

        let summary = multi_progress.add(ProgressBar::new(0));
        summary.set_style(message_style());

        Self {
            multi_progress,
            summary,
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar(&self, id: &str) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap_or_else(|p| p.into_inner());
        bars.entry(id.to_string())
            .or_insert_with(|| {
                let pb = self.multi_progress.add(ProgressBar::new(100));
                pb.set_style(message_style());
                pb
            })
            .clone()
    }
}

impl Default for TerminalNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn message_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("[{bar:40.cyan/blue}] {msg}")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

impl Notifier for TerminalNotifier {
    fn display_summary(&self, _id: &str, title: &str, body: Option<&str>) {
        match body {
            Some(body) => self.summary.set_message(format!("{}: {}", title, body)),
            None => self.summary.set_message(title.to_string()),
        }
        self.summary.tick();
    }

    fn display_file_progress(&self, n: &FileNotification) {
        let pb = self.bar(&n.id);
        match n.progress {
            Some(p) => {
                pb.set_style(bar_style());
                pb.set_length(u64::from(p.max));
                pb.set_position(u64::from(p.current));
            }
            None => pb.set_style(message_style()),
        }
        match &n.body {
            Some(body) => pb.set_message(format!("{} {}", n.title, body)),
            None => pb.set_message(n.title.clone()),
        }
        pb.tick();
    }

    fn cancel_notification(&self, id: &str) {
        let removed = self
            .bars
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(id);
        if let Some(pb) = removed {
            pb.finish_and_clear();
            self.multi_progress.remove(&pb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_notification_carries_cancel_action() {
        let n = FileNotification::progress("download-a.pdf", "a.pdf", 40, 30);
        assert_eq!(n.title, "Downloading: a.pdf - 30%");
        assert_eq!(
            n.progress,
            Some(ProgressIndicator {
                max: 100,
                current: 30
            })
        );
        assert_eq!(n.actions, vec![NotificationAction::cancel()]);
        assert!(n.sound.is_none());
    }

    #[test]
    fn terminal_notifications_play_sound() {
        let done = FileNotification::complete("download-a.pdf", "a.pdf", 40);
        assert_eq!(done.body.as_deref(), Some("Download complete."));
        assert_eq!(done.sound.as_deref(), Some(DEFAULT_SOUND));
        assert!(done.actions.is_empty());

        let failed = FileNotification::failed("download-a.pdf", "a.pdf", 40, "boom");
        assert_eq!(failed.body.as_deref(), Some("Failed: boom"));
    }

    #[test]
    fn started_title_is_truncated() {
        let name = format!("{}.bin", "x".repeat(80));
        let n = FileNotification::started("id", &name, 20);
        assert_eq!(n.title.chars().count(), "Downloading: ".len() + 20);
    }

    #[test]
    fn json_event_shape() {
        let n = FileNotification::complete("download-a.pdf", "a.pdf", 40);
        let value = serde_json::to_value(NotificationEvent::File(&n)).unwrap();
        assert_eq!(value["kind"], "file");
        assert_eq!(value["id"], "download-a.pdf");
        assert_eq!(value["body"], "Download complete.");
        assert!(value.get("progress").is_none());

        let value = serde_json::to_value(NotificationEvent::Summary {
            id: SUMMARY_ID,
            title: "Downloading files...",
            body: None,
        })
        .unwrap();
        assert_eq!(value["kind"], "summary");
        assert!(value.get("body").is_none());
    }
}
