//! Decides where each completed file ends up: persisted into the granted
//! destination, or collected and handed to the share sink in one go.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DispositionError;
use crate::models::DownloadRequest;
use crate::share::{ShareOutcome, ShareSink};
use crate::state::{CompletedTransfer, TransferState};
use crate::storage::{FileStore, StorageAccess};

/// Whether the platform can write straight into user storage.
#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispositionMode {
    /// Ask for a destination grant and persist there, sharing only as a
    /// fallback.
    #[default]
    Persist,
    /// Never persist; every completed file goes to the share sink.
    Share,
}

#[derive(Debug, Default)]
pub struct DispositionReport {
    pub persisted: Vec<PathBuf>,
    pub shared: Vec<PathBuf>,
    pub share_outcome: Option<ShareOutcome>,
    pub errors: Vec<DispositionError>,
}

pub struct DispositionPipeline<'a> {
    mode: DispositionMode,
    files: &'a dyn FileStore,
    storage: &'a dyn StorageAccess,
    share: &'a dyn ShareSink,
}

impl<'a> DispositionPipeline<'a> {
    pub fn new(
        mode: DispositionMode,
        files: &'a dyn FileStore,
        storage: &'a dyn StorageAccess,
        share: &'a dyn ShareSink,
    ) -> Self {
        Self {
            mode,
            files,
            storage,
            share,
        }
    }

    /// Walks the settled batch in request order. Strictly sequential so that
    /// each unique name sees the ones chosen before it.
    pub async fn run(&self, settled: &[(&DownloadRequest, &TransferState)]) -> DispositionReport {
        let mut report = DispositionReport::default();

        let successes: Vec<(&DownloadRequest, &CompletedTransfer)> = settled
            .iter()
            .filter_map(|(req, state)| state.completed().map(|done| (*req, done)))
            .collect();
        if successes.is_empty() {
            return report;
        }

        let grant = match self.mode {
            DispositionMode::Persist => self.storage.request_destination_grant().await,
            DispositionMode::Share => None,
        };
        if grant.is_none() {
            info!("no destination grant, completed files will be shared");
        }

        for (request, done) in successes {
            match &grant {
                Some(dir) => match self.persist(dir, request, done).await {
                    Ok(path) => report.persisted.push(path),
                    Err(e) => {
                        warn!(filename = %request.filename, error = %e, "error saving to destination");
                        report.errors.push(e);
                    }
                },
                None => report.shared.push(done.locator.clone()),
            }
        }

        if !report.shared.is_empty() {
            match self.share.share(&report.shared).await {
                Ok(outcome) => report.share_outcome = Some(outcome),
                Err(e) => {
                    warn!(error = %e, "error sharing files");
                    report.errors.push(DispositionError::ShareFailed(e));
                }
            }
        }

        report
    }

    async fn persist(
        &self,
        dir: &Path,
        request: &DownloadRequest,
        done: &CompletedTransfer,
    ) -> Result<PathBuf, DispositionError> {
        let persist_failed = |source| DispositionError::PersistFailed {
            filename: request.filename.clone(),
            source,
        };

        let bytes = self.files.read_all(&done.locator).await.map_err(persist_failed)?;
        let entry = self
            .files
            .create_unique_entry(dir, &request.filename, done.content_type.as_deref())
            .await
            .map_err(persist_failed)?;
        self.files.write_all(&entry, &bytes).await.map_err(persist_failed)?;
        Ok(entry)
    }
}
