//! One file's download, from precheck to a terminal state.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::{header, Client};
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::TransferError;
use crate::format::sanitize_filename;
use crate::models::{DownloadRequest, TransferId};
use crate::notify::{FileNotification, Notifier};
use crate::precheck::{Clearance, DiskSpacePrecheck, SizeProbe};
use crate::progress::{ProgressBucketer, ProgressEvent};
use crate::registry::{AlreadyActive, CancelHandle, CancellationRegistry};
use crate::state::{CompletedTransfer, TransferState};
use crate::storage::FileStore;

/// Everything a transfer borrows from the batch that runs it.
pub struct TransferContext<'a> {
    pub client: &'a Client,
    pub registry: &'a CancellationRegistry,
    pub notifier: &'a dyn Notifier,
    pub probe: &'a dyn SizeProbe,
    pub files: &'a dyn FileStore,
    pub temp_dir: &'a Path,
    pub title_width: usize,
}

pub struct TransferUnit<'a> {
    /// Position in the batch. Keeps temp paths apart when filenames repeat.
    slot: usize,
    request: &'a DownloadRequest,
    id: TransferId,
    state: TransferState,
    ctx: &'a TransferContext<'a>,
}

impl<'a> TransferUnit<'a> {
    pub fn new(slot: usize, request: &'a DownloadRequest, ctx: &'a TransferContext<'a>) -> Self {
        Self {
            slot,
            request,
            id: request.id(),
            state: TransferState::Pending,
            ctx,
        }
    }

    pub fn id(&self) -> &TransferId {
        &self.id
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    /// `<temp_dir>/<slot>/<filename>`: the file keeps its name for sharing,
    /// and no two units of one batch write to the same path.
    pub fn temp_path(&self) -> PathBuf {
        self.slot_dir().join(sanitize_filename(&self.request.filename))
    }

    fn slot_dir(&self) -> PathBuf {
        self.ctx.temp_dir.join(self.slot.to_string())
    }

    /// Drives the transfer to a terminal state. Never returns an error: every
    /// failure is folded into the returned state and surfaced as a
    /// notification.
    pub async fn run(mut self) -> TransferState {
        let precheck = DiskSpacePrecheck::new(self.ctx.probe, self.ctx.files, self.ctx.temp_dir);
        let clearance = match precheck.check(self.request).await {
            Ok(clearance) => clearance,
            Err(e) => return self.fail(e),
        };

        let handle = CancelHandle::new();
        if let Err(AlreadyActive(id)) = self.ctx.registry.register(self.id.clone(), handle.clone())
        {
            return self.fail(TransferError::AlreadyActive(id.to_string()));
        }
        self.transition(TransferState::InProgress);

        let result = self.stream_to_disk(clearance, &handle).await;
        self.ctx.registry.unregister(&self.id);

        match result {
            Ok(done) => {
                info!(id = %self.id, bytes = done.bytes, sha256 = %done.sha256, "download complete");
                self.transition(TransferState::Completed(done));
                self.state
            }
            Err(TransferError::Cancelled) => {
                self.discard_partial().await;
                info!(id = %self.id, "download cancelled");
                self.transition(TransferState::Cancelled);
                self.state
            }
            Err(e) => {
                self.discard_partial().await;
                self.fail(e)
            }
        }
    }

    async fn stream_to_disk(
        &self,
        clearance: Clearance,
        handle: &CancelHandle,
    ) -> Result<CompletedTransfer, TransferError> {
        let token = handle.token();

        let mut request = self.ctx.client.get(&self.request.url);
        if let Some(headers) = &self.request.headers {
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(TransferError::Cancelled),
            resp = request.send() => resp?,
        };
        if !response.status().is_success() {
            return Err(TransferError::Status(response.status()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let expected = response
            .content_length()
            .filter(|n| *n > 0)
            .unwrap_or(clearance.expected_bytes);

        tokio::fs::create_dir_all(self.slot_dir()).await?;
        let path = self.temp_path();
        let mut file = File::create(&path).await?;
        let mut hasher = Sha256::new();
        let mut written = 0u64;
        let mut bucketer = ProgressBucketer::new();
        let mut stream = response.bytes_stream();

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(TransferError::Cancelled),
                item = stream.next() => item,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk?;

            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            written += chunk.len() as u64;

            if let Some(event) = bucketer.observe_bytes(written, expected) {
                self.report(event);
            }
        }
        file.flush().await?;

        if let Some(event) = bucketer.finish() {
            self.report(event);
        }

        Ok(CompletedTransfer {
            locator: path,
            content_type,
            bytes: written,
            sha256: hex::encode(hasher.finalize()),
        })
    }

    fn report(&self, event: ProgressEvent) {
        let id = self.id.as_str();
        let name = &self.request.filename;
        let width = self.ctx.title_width;
        let notification = match event {
            ProgressEvent::Bucket { percent, .. } => {
                debug!(%id, percent, "progress");
                FileNotification::progress(id, name, width, percent)
            }
            ProgressEvent::Complete => FileNotification::complete(id, name, width),
        };
        self.ctx.notifier.display_file_progress(&notification);
    }

    fn fail(mut self, error: TransferError) -> TransferState {
        warn!(id = %self.id, url = %self.request.url, error = %error, "download failed");
        self.ctx.notifier.display_file_progress(&FileNotification::failed(
            self.id.as_str(),
            &self.request.filename,
            self.ctx.title_width,
            &error.to_string(),
        ));
        self.transition(TransferState::Failed(error));
        self.state
    }

    async fn discard_partial(&self) {
        let path = self.temp_path();
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(?path, error = %e, "could not remove partial file");
            }
        }
    }

    fn transition(&mut self, next: TransferState) {
        debug!(id = %self.id, from = self.state.label(), to = next.label(), "transfer state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use crate::precheck::HttpSizeProbe;
    use crate::storage::LocalFileStore;

    #[test]
    fn repeated_filenames_get_separate_temp_paths() {
        let client = Client::new();
        let registry = CancellationRegistry::new();
        let probe = HttpSizeProbe::new(client.clone());
        let ctx = TransferContext {
            client: &client,
            registry: &registry,
            notifier: &LogNotifier,
            probe: &probe,
            files: &LocalFileStore,
            temp_dir: Path::new("/tmp/work"),
            title_width: 40,
        };
        let request = DownloadRequest::new("https://example.com/x.bin", "x.bin");

        let first = TransferUnit::new(0, &request, &ctx);
        let second = TransferUnit::new(1, &request, &ctx);

        assert_eq!(first.temp_path(), Path::new("/tmp/work/0/x.bin"));
        assert_eq!(second.temp_path(), Path::new("/tmp/work/1/x.bin"));
        assert_eq!(first.id(), second.id());
    }
}
