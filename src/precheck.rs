//! Gatekeeper run before a transfer starts: is the size known, and does it fit?

use std::path::Path;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, warn};

use crate::error::TransferError;
use crate::models::DownloadRequest;
use crate::storage::FileStore;

/// Best-effort remote size lookup. `None` means "unknown", never an error.
#[async_trait]
pub trait SizeProbe: Send + Sync {
    async fn remote_size(&self, request: &DownloadRequest) -> Option<u64>;
}

/// Asks the server with a HEAD request and reads `Content-Length`.
#[derive(Debug, Clone)]
pub struct HttpSizeProbe {
    client: Client,
}

impl HttpSizeProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SizeProbe for HttpSizeProbe {
    async fn remote_size(&self, request: &DownloadRequest) -> Option<u64> {
        let mut head = self.client.head(&request.url);
        if let Some(headers) = &request.headers {
            for (name, value) in headers {
                head = head.header(name.as_str(), value.as_str());
            }
        }

        let response = match head.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(url = %request.url, error = %e, "error fetching file size");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(url = %request.url, status = %response.status(), "size probe rejected");
            return None;
        }

        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
    }
}

/// Clearance to start; carries the size the transfer should expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clearance {
    pub expected_bytes: u64,
}

/// Pure decision given a resolved size and the free space on the volume.
pub fn evaluate(size: Option<u64>, free_space: u64) -> Result<Clearance, TransferError> {
    let required = size.ok_or(TransferError::SizeUnknown)?;
    if free_space < required {
        return Err(TransferError::InsufficientSpace {
            required,
            available: free_space,
        });
    }
    Ok(Clearance {
        expected_bytes: required,
    })
}

pub struct DiskSpacePrecheck<'a> {
    probe: &'a dyn SizeProbe,
    files: &'a dyn FileStore,
    volume: &'a Path,
}

impl<'a> DiskSpacePrecheck<'a> {
    pub fn new(probe: &'a dyn SizeProbe, files: &'a dyn FileStore, volume: &'a Path) -> Self {
        Self {
            probe,
            files,
            volume,
        }
    }

    /// The probed size wins over the declared one; zero counts as unknown.
    pub async fn check(&self, request: &DownloadRequest) -> Result<Clearance, TransferError> {
        let probed = self.probe.remote_size(request).await.filter(|s| *s > 0);
        let size = probed.or(request.size.filter(|s| *s > 0));
        if size.is_none() {
            return Err(TransferError::SizeUnknown);
        }

        let free = self
            .files
            .free_space(self.volume)
            .await
            .map_err(TransferError::FreeSpace)?;
        debug!(filename = %request.filename, ?size, free, "disk space precheck");
        evaluate(size, free)
    }
}
