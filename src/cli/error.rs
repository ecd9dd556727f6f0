//! CLI error types and conversions

use crate::api::ApiError;
use crate::downloader::DownloadError;
use crate::pipeline::PipelineError;
use crate::storage::StorageError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// API error
    #[error("API error: {0}")]
    ApiError(#[from] ApiError),

    /// Download error
    #[error("download error: {0}")]
    DownloadError(#[from] DownloadError),

    /// Pipeline error
    #[error("pipeline error: {0}")]
    PipelineError(#[from] PipelineError),

    /// Storage error
    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    /// One or more datasets failed after their retries
    #[error("{failed} dataset(s) failed to download")]
    DownloadsFailed {
        /// Number of datasets in the failure report
        failed: usize,
    },

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
