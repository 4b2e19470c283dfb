//! Runs one batch: fan out transfers, wait for all of them, report, dispose,
//! clean up.

use std::sync::Arc;

use futures::future::join_all;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::config::DownloadConfig;
use crate::disposition::{DispositionPipeline, DispositionReport};
use crate::error::BatchError;
use crate::models::DownloadRequest;
use crate::notify::{FileNotification, Notifier, SUMMARY_ID};
use crate::precheck::{HttpSizeProbe, SizeProbe};
use crate::registry::{self, CancellationRegistry};
use crate::share::ShareSink;
use crate::state::{BatchSummary, TransferState};
use crate::storage::{ensure_dir_exists, DirectoryGrant, FileStore, LocalFileStore, StorageAccess};
use crate::transfer::{TransferContext, TransferUnit};

const STARTING_TITLE: &str = "Downloading files...";
const SUMMARY_TITLE: &str = "Downloads Summary";

/// The platform services a batch talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub notifier: Arc<dyn Notifier>,
    pub files: Arc<dyn FileStore>,
    pub probe: Arc<dyn SizeProbe>,
    pub storage: Arc<dyn StorageAccess>,
    pub share: Arc<dyn ShareSink>,
}

impl Collaborators {
    /// Local filesystem, HTTP size probe, and a grant for the configured
    /// destination.
    pub fn local(
        client: &Client,
        config: &DownloadConfig,
        notifier: Arc<dyn Notifier>,
        share: Arc<dyn ShareSink>,
    ) -> Self {
        Self {
            notifier,
            files: Arc::new(LocalFileStore),
            probe: Arc::new(HttpSizeProbe::new(client.clone())),
            storage: Arc::new(DirectoryGrant::new(config.destination.clone())),
            share,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub summary: BatchSummary,
    /// Terminal state per request, in request order.
    pub outcomes: Vec<TransferState>,
    pub disposition: DispositionReport,
}

pub struct Downloader {
    client: Client,
    config: DownloadConfig,
    registry: CancellationRegistry,
    collaborators: Collaborators,
}

impl Downloader {
    pub fn new(config: DownloadConfig, collaborators: Collaborators) -> Self {
        let client = build_client(&config);
        Self::with_client(client, config, collaborators)
    }

    pub fn with_client(client: Client, config: DownloadConfig, collaborators: Collaborators) -> Self {
        Self {
            client,
            config,
            registry: CancellationRegistry::new(),
            collaborators,
        }
    }

    pub fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Entry point for notification actions such as "cancel".
    pub fn handle_action(&self, notification_id: &str, action_id: &str) -> bool {
        registry::handle_action(
            &self.registry,
            self.collaborators.notifier.as_ref(),
            notification_id,
            action_id,
        )
    }

    /// Downloads the batch. Outcomes surface through notifications; nothing
    /// is returned and nothing is raised.
    pub async fn download_batch(&self, requests: Vec<DownloadRequest>) {
        if let Err(e) = self.run(&requests).await {
            error!(error = %e, "unexpected error while downloading files");
        }
    }

    /// Same as [`download_batch`](Self::download_batch), but hands back what
    /// happened.
    pub async fn run(&self, requests: &[DownloadRequest]) -> Result<BatchReport, BatchError> {
        if requests.is_empty() {
            warn!("empty download batch, nothing to do");
            return Ok(BatchReport::default());
        }

        let notifier = self.collaborators.notifier.as_ref();
        notifier.display_summary(SUMMARY_ID, STARTING_TITLE, None);
        for request in requests {
            notifier.display_file_progress(&FileNotification::started(
                request.id().as_str(),
                &request.filename,
                self.config.title_width,
            ));
        }

        let result = self.transfer_and_dispose(requests).await;
        if let Err(e) = &result {
            let reason = e.to_string();
            for request in requests {
                notifier.display_file_progress(&FileNotification::failed(
                    request.id().as_str(),
                    &request.filename,
                    self.config.title_width,
                    &reason,
                ));
            }
            let summary = BatchSummary {
                failed: requests.len(),
                ..Default::default()
            };
            notifier.display_summary(SUMMARY_ID, SUMMARY_TITLE, Some(&summary.body()));
        }

        self.cleanup().await;
        result
    }

    async fn transfer_and_dispose(
        &self,
        requests: &[DownloadRequest],
    ) -> Result<BatchReport, BatchError> {
        let c = &self.collaborators;
        ensure_dir_exists(c.files.as_ref(), &self.config.temp_dir)
            .await
            .map_err(BatchError::TempDir)?;

        let ctx = TransferContext {
            client: &self.client,
            registry: &self.registry,
            notifier: c.notifier.as_ref(),
            probe: c.probe.as_ref(),
            files: c.files.as_ref(),
            temp_dir: &self.config.temp_dir,
            title_width: self.config.title_width,
        };

        info!(files = requests.len(), "starting batch");
        let outcomes: Vec<TransferState> = join_all(
            requests
                .iter()
                .enumerate()
                .map(|(slot, r)| TransferUnit::new(slot, r, &ctx).run()),
        )
        .await;

        let summary = BatchSummary::from_states(&outcomes);
        info!(
            completed = summary.completed,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "batch settled"
        );
        c.notifier
            .display_summary(SUMMARY_ID, SUMMARY_TITLE, Some(&summary.body()));

        let settled: Vec<(&DownloadRequest, &TransferState)> =
            requests.iter().zip(outcomes.iter()).collect();
        let disposition = DispositionPipeline::new(
            self.config.disposition,
            c.files.as_ref(),
            c.storage.as_ref(),
            c.share.as_ref(),
        )
        .run(&settled)
        .await;

        Ok(BatchReport {
            summary,
            outcomes,
            disposition,
        })
    }

    /// Forgets registered transfers and deletes the temporary directory.
    /// Safe to call repeatedly.
    pub async fn cleanup(&self) {
        self.registry.clear_all();
        if let Err(e) = self
            .collaborators
            .files
            .delete_tree(&self.config.temp_dir)
            .await
        {
            warn!(error = %e, "failed to delete temporary files");
        }
    }
}

pub fn build_client(config: &DownloadConfig) -> Client {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "falling back to default HTTP client");
            Client::new()
        })
}
