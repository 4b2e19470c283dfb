use std::path::PathBuf;
use std::time::Duration;

use crate::disposition::DispositionMode;
use crate::format::DEFAULT_TITLE_WIDTH;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Scratch directory every transfer in a batch writes into. Deleted after
    /// each batch.
    pub temp_dir: PathBuf,
    /// Destination for persisted files; `None` means share instead.
    pub destination: Option<PathBuf>,
    pub disposition: DispositionMode,
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// Max filename length shown in notification titles.
    pub title_width: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            destination: None,
            disposition: DispositionMode::default(),
            user_agent: format!("batchdl/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            title_width: DEFAULT_TITLE_WIDTH,
        }
    }
}

impl DownloadConfig {
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_destination(mut self, dir: Option<PathBuf>) -> Self {
        self.destination = dir;
        self
    }

    pub fn with_disposition(mut self, mode: DispositionMode) -> Self {
        self.disposition = mode;
        self
    }
}

/// Per-process so two running instances never delete each other's files.
pub fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("batchdl-{}", std::process::id()))
}
