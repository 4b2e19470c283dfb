//! Batch download engine: fetches a list of files concurrently, reports
//! progress through notifications, then persists or shares what arrived.

pub mod cli;
pub mod config;
pub mod control;
pub mod disposition;
pub mod downloader;
pub mod error;
pub mod format;
pub mod input;
pub mod logging;
pub mod models;
pub mod notify;
pub mod permission;
pub mod precheck;
pub mod progress;
pub mod registry;
pub mod share;
pub mod state;
pub mod storage;
pub mod transfer;

pub use config::DownloadConfig;
pub use disposition::DispositionMode;
pub use downloader::{BatchReport, Collaborators, Downloader};
pub use models::{DownloadRequest, TransferId};
pub use state::{BatchSummary, TransferState};
