//! Token lifecycle: reactive refresh on provider-signaled rejection, with
//! a single retry per dataset and single-flight refresh across workers.

use super::fixtures::{descriptor, FakeEumetsat};
use async_trait::async_trait;
use bytes::Bytes;
use eumetsat_data_downloader::api::{
    ApiError, ApiResult, DataApi, SearchPage, SearchQuery,
};
use eumetsat_data_downloader::downloader::{DownloadError, DownloadManager};
use eumetsat_data_downloader::Credentials;
use std::sync::Arc;

fn credentials() -> Credentials {
    Credentials::new("consumer-key", "consumer-secret")
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_the_transfer_retried_once() {
    let datasets = vec![descriptor(4)];
    let api = Arc::new(FakeEumetsat::new(datasets.clone()).with_expiring_first_token());
    let data_dir = tempfile::TempDir::new().unwrap();

    let manager = DownloadManager::new(api.clone(), credentials(), data_dir.path());
    let outcome = manager.download_datasets(datasets).await.unwrap();

    assert_eq!(outcome.summary.downloaded, 1);
    assert_eq!(outcome.summary.failed, 0);
    // One rejected attempt, one successful retry.
    assert_eq!(api.download_requests(), 2);
    // Bootstrap mint plus exactly one refresh.
    assert_eq!(api.token_requests(), 2);
}

#[tokio::test]
async fn test_concurrent_expiry_collapses_to_one_refresh() {
    let datasets = vec![descriptor(4), descriptor(9), descriptor(14)];
    let api = Arc::new(FakeEumetsat::new(datasets.clone()).with_expiring_first_token());
    let data_dir = tempfile::TempDir::new().unwrap();

    let manager = DownloadManager::new(api.clone(), credentials(), data_dir.path())
        .with_concurrency(3);
    let outcome = manager.download_datasets(datasets).await.unwrap();

    assert_eq!(outcome.summary.downloaded, 3);
    // However many workers observed the stale token, only one refresh hits
    // the provider.
    assert_eq!(api.token_requests(), 2);
}

/// Provider that rejects the credential pair outright.
struct RejectingApi;

#[async_trait]
impl DataApi for RejectingApi {
    async fn request_token(&self, _credentials: &Credentials) -> ApiResult<String> {
        Err(ApiError::Auth("invalid_client".to_string()))
    }

    async fn search_page(&self, _query: &SearchQuery) -> ApiResult<SearchPage> {
        Err(ApiError::Auth("invalid_client".to_string()))
    }

    async fn download_dataset(&self, _c: &str, _d: &str, _t: &str) -> ApiResult<Bytes> {
        Err(ApiError::Auth("invalid_client".to_string()))
    }
}

#[tokio::test]
async fn test_rejected_credentials_abort_the_whole_run() {
    let datasets = vec![descriptor(4), descriptor(9)];
    let data_dir = tempfile::TempDir::new().unwrap();

    let manager = DownloadManager::new(Arc::new(RejectingApi), credentials(), data_dir.path());
    let err = manager.download_datasets(datasets).await.unwrap_err();

    assert!(matches!(err, DownloadError::Api(ApiError::Auth(_))));
}
