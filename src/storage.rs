//! File primitives the downloader needs, and how a destination directory is
//! granted.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::format::{numbered_name, sanitize_filename};

const MAX_NAME_ATTEMPTS: usize = 10_000;

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    async fn create_dir(&self, path: &Path) -> Result<(), StorageError>;

    async fn read_all(&self, path: &Path) -> Result<Vec<u8>, StorageError>;

    async fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError>;

    /// Creates an empty entry in `dir` named after `name`, numbered
    /// `name (n).ext` if that name is taken. Returns the new entry's path.
    async fn create_unique_entry(
        &self,
        dir: &Path,
        name: &str,
        content_type: Option<&str>,
    ) -> Result<PathBuf, StorageError>;

    /// Removes `path` and everything below it. A missing path is fine.
    async fn delete_tree(&self, path: &Path) -> Result<(), StorageError>;

    /// Bytes available to the current user on the volume holding `path`.
    async fn free_space(&self, path: &Path) -> Result<u64, StorageError>;
}

pub async fn ensure_dir_exists(store: &dyn FileStore, dir: &Path) -> Result<(), StorageError> {
    if !store.exists(dir).await {
        debug!(?dir, "directory doesn't exist, creating");
        store.create_dir(dir).await?;
    }
    Ok(())
}

/// First of `filename`, `stem (1).ext`, `stem (2).ext`, ... not in `taken`.
pub fn unique_name(filename: &str, taken: &HashSet<String>) -> Option<String> {
    if !taken.contains(filename) {
        return Some(filename.to_string());
    }
    (1..MAX_NAME_ATTEMPTS)
        .map(|n| numbered_name(filename, n))
        .find(|candidate| !taken.contains(candidate))
}

/// `FileStore` over the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStore;

impl LocalFileStore {
    async fn entry_names(dir: &Path) -> Result<HashSet<String>, StorageError> {
        let mut names = HashSet::new();
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| StorageError::io("read directory", dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io("read directory", dir, e))?
        {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn create_dir(&self, path: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| StorageError::io("create directory", path, e))
    }

    async fn read_all(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        fs::read(path)
            .await
            .map_err(|e| StorageError::io("read", path, e))
    }

    async fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await
            .map_err(|e| StorageError::io("open", path, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| StorageError::io("write", path, e))?;
        file.flush()
            .await
            .map_err(|e| StorageError::io("flush", path, e))?;
        info!(?path, bytes = bytes.len(), "saved file");
        Ok(())
    }

    async fn create_unique_entry(
        &self,
        dir: &Path,
        name: &str,
        content_type: Option<&str>,
    ) -> Result<PathBuf, StorageError> {
        let name = sanitize_filename(name);
        let mut taken = Self::entry_names(dir).await?;

        loop {
            let candidate =
                unique_name(&name, &taken).ok_or_else(|| StorageError::NameExhausted(name.clone()))?;
            let path = dir.join(&candidate);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(_) => {
                    debug!(?path, content_type, "created destination entry");
                    return Ok(path);
                }
                // Someone else took the name between listing and creating.
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    taken.insert(candidate);
                }
                Err(e) => return Err(StorageError::io("create", path, e)),
            }
        }
    }

    async fn delete_tree(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io("delete", path, e)),
        }
    }

    async fn free_space(&self, path: &Path) -> Result<u64, StorageError> {
        fs2::available_space(path).map_err(|e| StorageError::io("query free space", path, e))
    }
}

/// Hands out the directory completed files are persisted into. `None` means
/// the caller falls back to sharing.
#[async_trait]
pub trait StorageAccess: Send + Sync {
    async fn request_destination_grant(&self) -> Option<PathBuf>;
}

/// Grants a fixed directory, creating it on first request.
#[derive(Debug, Clone, Default)]
pub struct DirectoryGrant {
    destination: Option<PathBuf>,
}

impl DirectoryGrant {
    pub fn new(destination: Option<PathBuf>) -> Self {
        Self { destination }
    }
}

#[async_trait]
impl StorageAccess for DirectoryGrant {
    async fn request_destination_grant(&self) -> Option<PathBuf> {
        let dir = self.destination.as_ref()?;
        match fs::create_dir_all(dir).await {
            Ok(()) => Some(dir.clone()),
            Err(e) => {
                warn!(?dir, error = %e, "destination not usable, falling back to sharing");
                None
            }
        }
    }
}
