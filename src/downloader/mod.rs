//! Download orchestration
//!
//! The orchestrator composes discovery, partitioning, and per-dataset
//! retrieval:
//!
//! 1. **Discovery**: [`crate::api::search::discover`] lists the granules in
//!    a date range
//! 2. **Partitioning**: [`partition`] drops everything already present
//!    locally or in the bucket
//! 3. **Retrieval**: [`manager::DownloadManager`] drives a bounded pool of
//!    workers, each resolving a link, transferring the ZIP container,
//!    unpacking it, and extracting the metadata sidecar
//!
//! # Error Handling
//!
//! Per-dataset failures are caught at the per-id boundary, logged with
//! context, and accumulated into the end-of-run [`DownloadOutcome`]; the
//! batch continues with the remaining ids. Only integrity and
//! environment-class errors (pagination mismatch, credential rejection at
//! token minting, bucket listing failure) abort the whole run.

pub mod config;
pub mod manager;
pub mod partition;

pub use manager::DownloadManager;
pub use partition::{partition, Partition};

use crate::api::ApiError;
use crate::metadata::{MetadataError, MetadataRecord};
use crate::storage::StorageError;

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Provider API failure
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Sidecar metadata failure, fatal for the affected record only
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Cloud bucket failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The retrieved payload is not a readable ZIP container
    #[error("archive error: {0}")]
    Archive(String),

    /// Filesystem failure in the archive directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown was requested before this dataset started
    #[error("cancelled by shutdown request")]
    Cancelled,
}

/// End-of-run counters, reported once per batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Datasets discovered for the requested range
    pub queried: usize,
    /// Datasets transferred and unpacked in this run
    pub downloaded: usize,
    /// Datasets skipped because a local copy exists
    pub skipped_local: usize,
    /// Datasets skipped because a bucket copy exists
    pub skipped_bucket: usize,
    /// Datasets that failed after their single retry
    pub failed: usize,
    /// Datasets not attempted because shutdown was requested
    pub cancelled: usize,
}

/// One entry of the end-of-run failure report.
#[derive(Debug, Clone)]
pub struct DatasetFailure {
    /// Id of the dataset that failed
    pub dataset_id: String,
    /// Rendered failure cause
    pub error: String,
}

/// Result of one orchestrated batch.
#[derive(Debug, Default)]
pub struct DownloadOutcome {
    /// Metadata records of every successfully downloaded dataset
    pub records: Vec<MetadataRecord>,
    /// Counters for the user-visible summary
    pub summary: RunSummary,
    /// Per-dataset failures collected across the batch
    pub failures: Vec<DatasetFailure>,
}
