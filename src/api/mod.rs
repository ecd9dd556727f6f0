//! EUMETSAT data API access
//!
//! This module covers the three provider interactions the downloader needs:
//!
//! 1. **Token exchange**: OAuth2 client-credentials via [`token::TokenManager`]
//! 2. **Search**: windowed product discovery via [`search`]
//! 3. **Transfer**: dataset retrieval via the [`DataApi`] trait
//!
//! The [`DataApi`] trait is the seam between the orchestration logic and the
//! HTTP transport. Production code uses [`http::EumetsatApi`]; tests inject
//! fakes to exercise pagination and retry behavior without a network.

use crate::{Credentials, DatasetDescriptor};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

pub mod http;
pub mod search;
pub mod token;

/// API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The provider rejected the credential pair or returned a malformed
    /// token response. Fatal, never retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider rejected the access token passed with a request.
    /// Triggers the single refresh-and-retry path.
    #[error("the access token passed in the API request is invalid")]
    InvalidCredentials,

    /// Any other non-success response to a transfer or search request
    #[error("transfer failed: HTTP {status}: {body}")]
    Transfer {
        /// HTTP status code returned by the provider
        status: u16,
        /// Response body, truncated for logging
        body: String,
    },

    /// Network-level failure (timeout, connection refused, TLS)
    #[error("network error: {0}")]
    Network(String),

    /// Response could not be deserialized into the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// The paginator collected a different number of descriptors than the
    /// provider-reported total. Data-set integrity cannot be guaranteed,
    /// so discovery aborts.
    #[error("pagination integrity violated: collected {collected} of {total} reported results")]
    PaginationIntegrity {
        /// Descriptors accumulated across all pages
        collected: usize,
        /// `totalResults` reported by the first page
        total: usize,
    },
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// One windowed search request.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Product id, e.g. `EO:EUM:DAT:MSG:MSG15-RSS`
    pub product_id: String,
    /// Start of the query period (inclusive)
    pub start: DateTime<Utc>,
    /// End of the query period (inclusive)
    pub end: DateTime<Utc>,
    /// Starting index of returned entries
    pub start_index: usize,
    /// Number of entries requested, capped at the provider window
    pub count: usize,
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Provider-reported total across the whole query period
    pub total_results: usize,
    /// Descriptors in this page, in the provider's sort order
    pub features: Vec<DatasetDescriptor>,
}

/// Capability surface of the EUMETSAT data API.
///
/// Implemented by [`http::EumetsatApi`] for production and by in-memory
/// fakes in tests.
#[async_trait]
pub trait DataApi: Send + Sync {
    /// Exchange the credential pair for a bearer token.
    async fn request_token(&self, credentials: &Credentials) -> ApiResult<String>;

    /// Execute one windowed search request.
    async fn search_page(&self, query: &SearchQuery) -> ApiResult<SearchPage>;

    /// Retrieve one dataset as a ZIP-packaged byte buffer.
    async fn download_dataset(
        &self,
        collection_id: &str,
        dataset_id: &str,
        access_token: &str,
    ) -> ApiResult<Bytes>;
}
