//! Post-processing pipeline
//!
//! Turns the flat raw archive produced by the downloader into a compressed,
//! date-partitioned tree and mirrors that tree to cloud object storage:
//!
//! 1. **Compression**: [`compress::compress_directory`] runs each raw file
//!    through the external block compressor and moves the artifact into the
//!    partitioned tree derived from its embedded timestamp
//! 2. **Upload**: [`upload::upload_directory`] mirrors the partitioned tree
//!    to the bucket, skipping objects that already exist
//!
//! Both steps are idempotent: compression overwrites stale artifacts at the
//! same partitioned path, and upload checks the remote listing before
//! transferring anything.

pub mod compress;
pub mod filename;
pub mod upload;

pub use compress::compress_directory;
pub use upload::upload_directory;

use crate::storage::StorageError;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The external compressor is missing or broken. Fatal for the whole
    /// batch since every remaining file would hit the same wall.
    #[error("compression environment error: {0}")]
    CompressionEnvironment(String),

    /// A filename does not carry the provider's embedded timestamp, so no
    /// partitioned destination can be derived for it
    #[error("cannot derive partition path for {0}: no embedded timestamp")]
    UnpartitionableName(String),

    /// Cloud bucket failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Filesystem failure while moving or enumerating artifacts
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
