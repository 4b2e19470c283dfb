use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::disposition::DispositionMode;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifierKind {
    /// Progress bars on stderr
    Terminal,
    /// One JSON object per line on stdout, for a host UI
    Json,
    /// Log lines only
    Log,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Single URL to download (if provided, tasks-file is ignored)
    #[arg(index = 1)]
    pub url: Option<String>,

    /// File listing the downloads: a JSON array of requests, or one `url[|filename]` per line
    #[arg(short = 't', long = "tasks-file", default_value = "download.txt")]
    pub tasks_file: PathBuf,

    /// Filename for the single URL (defaults to the last path segment)
    #[arg(short = 'o', long = "output-name", requires = "url")]
    pub output_name: Option<String>,

    /// Declared size in bytes for the single URL, used when the server does not report one
    #[arg(long, requires = "url")]
    pub size: Option<u64>,

    /// Extra request header for the single URL, as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header", requires = "url")]
    pub headers: Vec<String>,

    /// Directory completed files are saved into; without it they are shared instead
    #[arg(short = 'd', long = "download-dir")]
    pub download_dir: Option<PathBuf>,

    /// Scratch directory for in-flight downloads (deleted afterwards)
    #[arg(long = "temp-dir")]
    pub temp_dir: Option<PathBuf>,

    /// Persist into --download-dir when possible, or always share
    #[arg(long, value_enum, default_value = "persist")]
    pub disposition: DispositionMode,

    /// Program that receives all shared files as arguments in one call
    #[arg(long = "share-with")]
    pub share_with: Option<String>,

    /// Extra argument passed to the share program before the files (repeatable)
    #[arg(long = "share-arg", requires = "share_with")]
    pub share_args: Vec<String>,

    /// Exit code of the share program meaning the user dismissed it
    #[arg(long = "share-dismiss-code", requires = "share_with")]
    pub share_dismiss_code: Option<i32>,

    /// How download progress is shown
    #[arg(long, value_enum, default_value = "terminal")]
    pub notifier: NotifierKind,

    /// Where the notification permission decision is remembered
    #[arg(long = "state-file", default_value = ".batchdl-state.json")]
    pub state_file: PathBuf,

    /// Refuse notification permission (progress goes to the log only)
    #[arg(long = "deny-notifications")]
    pub deny_notifications: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// `"Authorization: Bearer x"` -> `("Authorization", "Bearer x")`
pub fn parse_header(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_url_options() {
        let args = Args::try_parse_from([
            "batchdl",
            "https://example.com/a.pdf",
            "-o",
            "report.pdf",
            "--size",
            "100",
            "-H",
            "Authorization: Bearer x",
            "--disposition",
            "share",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.url.as_deref(), Some("https://example.com/a.pdf"));
        assert_eq!(args.output_name.as_deref(), Some("report.pdf"));
        assert_eq!(args.size, Some(100));
        assert_eq!(args.disposition, DispositionMode::Share);
        assert_eq!(args.notifier, NotifierKind::Terminal);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn single_url_options_need_a_url() {
        assert!(Args::try_parse_from(["batchdl", "--size", "3"]).is_err());
    }

    #[test]
    fn dismiss_code_needs_a_share_program() {
        assert!(Args::try_parse_from(["batchdl", "--share-dismiss-code", "3"]).is_err());
        let args = Args::try_parse_from([
            "batchdl",
            "--share-with",
            "xdg-open",
            "--share-dismiss-code",
            "3",
        ])
        .unwrap();
        assert_eq!(args.share_dismiss_code, Some(3));
    }

    #[test]
    fn header_parsing() {
        assert_eq!(
            parse_header("Authorization: Bearer a:b"),
            Some(("Authorization".into(), "Bearer a:b".into()))
        );
        assert_eq!(parse_header("no-colon"), None);
        assert_eq!(parse_header(": value"), None);
    }
}
