//! # EUMETSAT Data Downloader Library
//!
//! A library for building local or cloud-resident archives of EUMETSAT
//! satellite imagery products. Designed for data-pipeline operators feeding
//! downstream processing such as nowcasting models.
//!
//! ## Features
//!
//! - **Windowed Discovery**: Pagination over the search API across the
//!   provider's 10,000-result-per-request cap
//! - **Reactive Authentication**: OAuth2 client-credentials token with
//!   single-flight refresh on provider-signaled rejection
//! - **Idempotent Downloads**: Datasets already present locally or in a
//!   cloud bucket are skipped, never re-fetched
//! - **Typed Metadata**: Declarative extraction of the `EOPMetadata.xml`
//!   sidecar into strongly typed records
//! - **Post-processing**: External block compression into a date-partitioned
//!   tree, mirrored to S3-compatible object storage
//!
//! ## Quick Start
//!
//! ```no_run
//! use eumetsat_data_downloader::api::http::EumetsatApi;
//! use eumetsat_data_downloader::downloader::DownloadManager;
//! use eumetsat_data_downloader::Credentials;
//! use chrono::{TimeZone, Utc};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials::new("api-key", "api-secret");
//! let manager = DownloadManager::new(Arc::new(EumetsatApi::new()), credentials, "./data");
//!
//! let start = Utc.with_ymd_and_hms(2020, 6, 1, 11, 59, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2020, 6, 1, 12, 2, 0).unwrap();
//! let outcome = manager
//!     .download_range(start, end, "EO:EUM:DAT:MSG:MSG15-RSS")
//!     .await?;
//! println!("{} datasets downloaded", outcome.summary.downloaded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`api`] - Token management, search pagination, and the data API client
//! - [`metadata`] - Declarative XML sidecar extraction
//! - [`downloader`] - Download orchestration with partitioning and retry
//! - [`pipeline`] - Compression and cloud mirroring of downloaded files
//! - [`storage`] - Object storage listing and upload
//! - [`cli`] - Command implementations for the binary

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// EUMETSAT data API access
pub mod api;

/// CLI command implementations
pub mod cli;

/// Download orchestration
pub mod downloader;

/// Sidecar metadata extraction
pub mod metadata;

/// Compression and upload post-processing
pub mod pipeline;

/// Graceful shutdown coordination
pub mod shutdown;

/// Cloud object storage wrapper
pub mod storage;

/// API credential pair, immutable for the process lifetime.
///
/// Used solely to mint access tokens via the provider's OAuth2
/// client-credentials exchange.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// EUMETSAT API consumer key
    pub key: String,
    /// EUMETSAT API consumer secret
    pub secret: String,
}

impl Credentials {
    /// Create a new credential pair.
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

/// One discrete satellite-product granule discovered via the search API.
///
/// Produced by [`api::search::discover`], consumed by the
/// [`downloader::DownloadManager`]. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Provider-assigned dataset id, globally unique within a product window
    pub id: String,
    /// Collection the dataset belongs to (equals the product id for MSG15-RSS)
    pub collection_id: String,
    /// Sensing start time
    pub start: DateTime<Utc>,
    /// Sensing end time
    pub end: DateTime<Utc>,
}

/// Serialize a timestamp the way the search API expects it:
/// ISO-8601 with second precision and a `Z` designator.
pub fn format_query_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
