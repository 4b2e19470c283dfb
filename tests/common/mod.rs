#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;

use batchdl::error::{ShareError, StorageError};
use batchdl::notify::{FileNotification, Notifier};
use batchdl::precheck::HttpSizeProbe;
use batchdl::share::{ShareOutcome, ShareSink};
use batchdl::storage::{DirectoryGrant, FileStore, LocalFileStore};
use batchdl::{Collaborators, DispositionMode, DownloadConfig, Downloader};

#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Summary { title: String, body: Option<String> },
    File(FileNotification),
    Dismissed(String),
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<Shown>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Shown> {
        self.shown.lock().unwrap().clone()
    }

    pub fn files_for(&self, id: &str) -> Vec<FileNotification> {
        self.all()
            .into_iter()
            .filter_map(|s| match s {
                Shown::File(n) if n.id == id => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn last_summary_body(&self) -> Option<String> {
        self.all().into_iter().rev().find_map(|s| match s {
            Shown::Summary { body, .. } => Some(body),
            _ => None,
        })?
    }
}

impl Notifier for RecordingNotifier {
    fn display_summary(&self, _id: &str, title: &str, body: Option<&str>) {
        self.shown.lock().unwrap().push(Shown::Summary {
            title: title.to_string(),
            body: body.map(str::to_string),
        });
    }

    fn display_file_progress(&self, notification: &FileNotification) {
        self.shown
            .lock()
            .unwrap()
            .push(Shown::File(notification.clone()));
    }

    fn cancel_notification(&self, id: &str) {
        self.shown
            .lock()
            .unwrap()
            .push(Shown::Dismissed(id.to_string()));
    }
}

/// Records each share call along with whether every file still existed at
/// that moment.
#[derive(Default)]
pub struct RecordingShare {
    pub calls: Mutex<Vec<(Vec<PathBuf>, bool)>>,
}

#[async_trait]
impl ShareSink for RecordingShare {
    async fn share(&self, locators: &[PathBuf]) -> Result<ShareOutcome, ShareError> {
        let all_exist = locators.iter().all(|p| p.exists());
        self.calls
            .lock()
            .unwrap()
            .push((locators.to_vec(), all_exist));
        Ok(ShareOutcome::Shared)
    }
}

/// Local store that pretends the disk is almost full.
pub struct TightSpace {
    pub free: u64,
}

#[async_trait]
impl FileStore for TightSpace {
    async fn exists(&self, path: &Path) -> bool {
        LocalFileStore.exists(path).await
    }

    async fn create_dir(&self, path: &Path) -> Result<(), StorageError> {
        LocalFileStore.create_dir(path).await
    }

    async fn read_all(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        LocalFileStore.read_all(path).await
    }

    async fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        LocalFileStore.write_all(path, bytes).await
    }

    async fn create_unique_entry(
        &self,
        dir: &Path,
        name: &str,
        content_type: Option<&str>,
    ) -> Result<PathBuf, StorageError> {
        LocalFileStore.create_unique_entry(dir, name, content_type).await
    }

    async fn delete_tree(&self, path: &Path) -> Result<(), StorageError> {
        LocalFileStore.delete_tree(path).await
    }

    async fn free_space(&self, _path: &Path) -> Result<u64, StorageError> {
        Ok(self.free)
    }
}

/// Local store whose directories can never be created.
pub struct ReadOnlyDirs;

#[async_trait]
impl FileStore for ReadOnlyDirs {
    async fn exists(&self, _path: &Path) -> bool {
        false
    }

    async fn create_dir(&self, path: &Path) -> Result<(), StorageError> {
        Err(StorageError::io(
            "create directory",
            path,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume"),
        ))
    }

    async fn read_all(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        LocalFileStore.read_all(path).await
    }

    async fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        LocalFileStore.write_all(path, bytes).await
    }

    async fn create_unique_entry(
        &self,
        dir: &Path,
        name: &str,
        content_type: Option<&str>,
    ) -> Result<PathBuf, StorageError> {
        LocalFileStore.create_unique_entry(dir, name, content_type).await
    }

    async fn delete_tree(&self, _path: &Path) -> Result<(), StorageError> {
        Ok(())
    }

    async fn free_space(&self, _path: &Path) -> Result<u64, StorageError> {
        Ok(u64::MAX)
    }
}

pub struct Harness {
    pub downloader: Downloader,
    pub notifier: Arc<RecordingNotifier>,
    pub share: Arc<RecordingShare>,
    pub temp_dir: PathBuf,
    _scratch: tempfile::TempDir,
}

pub struct HarnessBuilder {
    destination: Option<PathBuf>,
    mode: DispositionMode,
    files: Arc<dyn FileStore>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            destination: None,
            mode: DispositionMode::Persist,
            files: Arc::new(LocalFileStore),
        }
    }

    pub fn destination(mut self, dir: &Path) -> Self {
        self.destination = Some(dir.to_path_buf());
        self
    }

    pub fn mode(mut self, mode: DispositionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn files(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = files;
        self
    }

    pub fn build(self) -> Harness {
        let scratch = tempfile::tempdir().unwrap();
        let temp_dir = scratch.path().join("work");
        let config = DownloadConfig::default()
            .with_temp_dir(&temp_dir)
            .with_destination(self.destination.clone())
            .with_disposition(self.mode);

        let client = Client::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let share = Arc::new(RecordingShare::default());
        let collaborators = Collaborators {
            notifier: notifier.clone(),
            files: self.files,
            probe: Arc::new(HttpSizeProbe::new(client.clone())),
            storage: Arc::new(DirectoryGrant::new(self.destination)),
            share: share.clone(),
        };

        Harness {
            downloader: Downloader::with_client(client, config, collaborators),
            notifier,
            share,
            temp_dir,
            _scratch: scratch,
        }
    }
}

pub fn harness() -> Harness {
    HarnessBuilder::new().build()
}
