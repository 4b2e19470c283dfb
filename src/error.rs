use std::path::PathBuf;

use thiserror::Error;

/// Why a single transfer did not complete.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Failed to get remote file size")]
    SizeUnknown,

    #[error("Not enough disk space: need {required} bytes, {available} available")]
    InsufficientSpace { required: u64, available: u64 },

    #[error("Download request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed with status {0}")]
    Status(reqwest::StatusCode),

    #[error("I/O error while downloading: {0}")]
    Io(#[from] std::io::Error),

    #[error("Free space query failed: {0}")]
    FreeSpace(#[source] StorageError),

    #[error("A transfer with id {0} is already in progress")]
    AlreadyActive(String),

    #[error("Download cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{op} {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not find a free name for {0} in the destination")]
    NameExhausted(String),
}

impl StorageError {
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Failed to launch share program {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Share program {program} exited with {status}")]
    Exit { program: String, status: String },
}

/// Errors raised while handing completed files to storage or the share sink.
#[derive(Debug, Error)]
pub enum DispositionError {
    #[error("Error saving {filename} to destination: {source}")]
    PersistFailed {
        filename: String,
        #[source]
        source: StorageError,
    },

    #[error("Error sharing files: {0}")]
    ShareFailed(#[from] ShareError),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to prepare temporary directory: {0}")]
    TempDir(#[source] StorageError),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Invalid URL {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to parse request list: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("Failed to access permission flag store {path:?}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt permission flag store: {0}")]
    Corrupt(#[from] serde_json::Error),
}
