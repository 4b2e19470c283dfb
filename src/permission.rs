//! Notification permission, asked at most once per install.
//!
//! The flag store remembers whether permission was granted. While the flag is
//! set the prompt is skipped entirely. A denial is stored as `false`, so
//! eligible platforms ask again next time.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PermissionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformInfo {
    Ios,
    Android { api_level: u32 },
    Desktop,
}

impl PlatformInfo {
    /// Android only gained a runtime notification permission at API 33;
    /// older releases grant it at install time.
    pub fn prompts_for_notifications(&self) -> bool {
        match self {
            PlatformInfo::Ios | PlatformInfo::Desktop => true,
            PlatformInfo::Android { api_level } => *api_level >= 33,
        }
    }
}

/// Persistence for the single "permission shown" flag.
pub trait FlagStore: Send + Sync {
    fn load(&self) -> Result<bool, PermissionError>;
    fn save(&self, shown: bool) -> Result<(), PermissionError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct FlagRecord {
    notification_permission_shown: bool,
    updated_at: DateTime<Utc>,
}

/// Keeps the flag in a small JSON file.
#[derive(Debug, Clone)]
pub struct JsonFlagStore {
    path: PathBuf,
}

impl JsonFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> PermissionError {
        PermissionError::Store {
            path: self.path.clone(),
            source,
        }
    }
}

impl FlagStore for JsonFlagStore {
    fn load(&self) -> Result<bool, PermissionError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(self.io_error(e)),
        };
        let record: FlagRecord = serde_json::from_str(&content)?;
        Ok(record.notification_permission_shown)
    }

    fn save(&self, shown: bool) -> Result<(), PermissionError> {
        let record = FlagRecord {
            notification_permission_shown: shown,
            updated_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&record)?;
        std::fs::write(&self.path, content).map_err(|e| self.io_error(e))
    }
}

/// The OS permission dialog.
#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    async fn check(&self) -> PermissionStatus;
    async fn request(&self) -> PermissionStatus;
}

/// A prompt that always answers the same, for hosts without a permission
/// system of their own.
#[derive(Debug, Clone, Copy)]
pub struct StaticPrompt(pub PermissionStatus);

#[async_trait]
impl PermissionPrompt for StaticPrompt {
    async fn check(&self) -> PermissionStatus {
        self.0
    }

    async fn request(&self) -> PermissionStatus {
        self.0
    }
}

pub struct NotificationPermission<S, P> {
    store: S,
    prompt: P,
    platform: PlatformInfo,
}

impl<S: FlagStore, P: PermissionPrompt> NotificationPermission<S, P> {
    pub fn new(store: S, prompt: P, platform: PlatformInfo) -> Self {
        Self {
            store,
            prompt,
            platform,
        }
    }

    /// Resolves whether notifications may be shown. Store failures are
    /// logged and treated as "not shown yet".
    pub async fn ensure(&self) -> PermissionStatus {
        let shown = self.store.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not read permission flag");
            false
        });
        if shown {
            debug!("notification permission already granted");
            return PermissionStatus::Granted;
        }

        let status = match self.prompt.check().await {
            PermissionStatus::Granted => PermissionStatus::Granted,
            PermissionStatus::Denied if self.platform.prompts_for_notifications() => {
                self.prompt.request().await
            }
            PermissionStatus::Denied => PermissionStatus::Granted,
        };

        self.record(status == PermissionStatus::Granted);
        status
    }

    fn record(&self, granted: bool) {
        if let Err(e) = self.store.save(granted) {
            warn!(error = %e, "could not persist permission flag");
        }
    }
}
