//! HTTP implementation of the EUMETSAT data API
//!
//! Provides a process-wide `reqwest::Client` with explicit timeouts and the
//! production [`EumetsatApi`] implementation of [`DataApi`]:
//! - `POST /token` with basic auth for the client-credentials exchange
//! - `GET /data/search-products/os` for windowed product search
//! - `GET /data/download/collections/{c}/products/{p}` for dataset transfer

use crate::api::{ApiError, ApiResult, DataApi, SearchPage, SearchQuery};
use crate::{format_query_datetime, Credentials, DatasetDescriptor};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default base URL of the EUMETSAT data API
pub const EUMETSAT_API_BASE_URL: &str = "https://api.eumetsat.int";

/// Provider-specific body substring that signals a rejected access token
const INVALID_TOKEN_MARKER: &str = "Invalid Credentials";

/// HTTP connect timeout - time to establish the TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP request timeout - overall time for the entire request.
/// Sized for full dataset transfers (~100 MB granules), not just API calls.
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Maximum response-body length carried in transfer error messages
const ERROR_BODY_TRUNCATE: usize = 512;

/// Global HTTP client shared by all API instances.
///
/// `reqwest::Client` clones cheaply, but a single process-wide instance
/// keeps connection pooling effective across concurrent download workers.
/// Configured with explicit timeouts so no operation blocks indefinitely.
static GLOBAL_HTTP_CLIENT: Lazy<Arc<Client>> = Lazy::new(|| {
    Arc::new(
        Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                panic!("FATAL: failed to build HTTP client: {e}. Check system TLS configuration.");
            }),
    )
});

/// Get the global HTTP client.
pub fn global_http_client() -> Arc<Client> {
    GLOBAL_HTTP_CLIENT.clone()
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    properties: SearchResponseProperties,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct SearchResponseProperties {
    #[serde(rename = "totalResults")]
    total_results: usize,
}

#[derive(Deserialize)]
struct Feature {
    id: String,
    properties: FeatureProperties,
}

#[derive(Deserialize)]
struct FeatureProperties {
    /// Sensing period of the granule, formatted `start/end`
    date: String,
}

/// Production [`DataApi`] implementation over HTTP.
pub struct EumetsatApi {
    client: Arc<Client>,
    base_url: String,
}

impl EumetsatApi {
    /// Create an API client against the production endpoint.
    pub fn new() -> Self {
        Self {
            client: global_http_client(),
            base_url: EUMETSAT_API_BASE_URL.to_string(),
        }
    }

    /// Create with a custom base URL (for testing).
    pub fn new_with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: global_http_client(),
            base_url: base_url.into(),
        }
    }

    fn token_url(&self) -> String {
        format!("{}/token", self.base_url)
    }

    fn search_url(&self) -> String {
        format!("{}/data/search-products/os", self.base_url)
    }

    /// Build the signed download URL for one dataset.
    ///
    /// Collection and dataset ids carry `:` and other reserved characters,
    /// so both path segments are percent-encoded.
    fn download_url(&self, collection_id: &str, dataset_id: &str, access_token: &str) -> String {
        format!(
            "{}/data/download/collections/{}/products/{}?access_token={}",
            self.base_url,
            percent_encode_segment(collection_id),
            percent_encode_segment(dataset_id),
            access_token
        )
    }
}

impl Default for EumetsatApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Percent-encode a single URL path segment.
fn percent_encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

/// Deserialize a search response body into a page of descriptors.
fn parse_search_body(body: &[u8], product_id: &str) -> ApiResult<SearchPage> {
    let parsed: SearchResponse = serde_json::from_slice(body)
        .map_err(|e| ApiError::Parse(format!("malformed search response: {e}")))?;

    let mut features = Vec::with_capacity(parsed.features.len());
    for feature in parsed.features {
        let (start, end) = parse_date_range(&feature.properties.date)?;
        features.push(DatasetDescriptor {
            id: feature.id,
            collection_id: product_id.to_string(),
            start,
            end,
        });
    }

    Ok(SearchPage {
        total_results: parsed.properties.total_results,
        features,
    })
}

/// Parse a `start/end` sensing period string into its two timestamps.
fn parse_date_range(raw: &str) -> ApiResult<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, end) = raw
        .split_once('/')
        .ok_or_else(|| ApiError::Parse(format!("malformed feature date range: {raw:?}")))?;
    Ok((parse_provider_datetime(start)?, parse_provider_datetime(end)?))
}

fn parse_provider_datetime(raw: &str) -> ApiResult<DateTime<Utc>> {
    // The provider emits RFC 3339 timestamps, occasionally without a
    // trailing designator.
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(&format!("{raw}Z")))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::Parse(format!("invalid timestamp {raw:?}: {e}")))
}

#[async_trait]
impl DataApi for EumetsatApi {
    async fn request_token(&self, credentials: &Credentials) -> ApiResult<String> {
        debug!("Requesting access token");

        let response = self
            .client
            .post(self.token_url())
            .basic_auth(&credentials.key, Some(&credentials.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Auth(format!(
                "token endpoint returned HTTP {status}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Auth(format!("malformed token response: {e}")))?;

        body.access_token
            .ok_or_else(|| ApiError::Auth("token response missing access_token field".to_string()))
    }

    async fn search_page(&self, query: &SearchQuery) -> ApiResult<SearchPage> {
        let params = [
            ("format", "json".to_string()),
            ("pi", query.product_id.clone()),
            ("si", query.start_index.to_string()),
            ("c", query.count.to_string()),
            ("sort", "start,time,0".to_string()),
            ("dtstart", format_query_datetime(&query.start)),
            ("dtend", format_query_datetime(&query.end)),
        ];

        debug!(
            product_id = %query.product_id,
            count = query.count,
            dtstart = %format_query_datetime(&query.start),
            dtend = %format_query_datetime(&query.end),
            "Querying search endpoint"
        );

        let response = self
            .client
            .get(self.search_url())
            .query(&params)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Transfer {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        parse_search_body(&body, &query.product_id)
    }

    async fn download_dataset(
        &self,
        collection_id: &str,
        dataset_id: &str,
        access_token: &str,
    ) -> ApiResult<Bytes> {
        let url = self.download_url(collection_id, dataset_id, access_token);
        debug!(dataset_id, "Downloading dataset");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains(INVALID_TOKEN_MARKER) {
                return Err(ApiError::InvalidCredentials);
            }
            return Err(ApiError::Transfer {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }
}

fn truncate_body(body: &str) -> String {
    let mut truncated: String = body.chars().take(ERROR_BODY_TRUNCATE).collect();
    if truncated.len() < body.len() {
        truncated.push_str("...");
    }
    truncated
}
