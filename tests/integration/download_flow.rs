//! End-to-end download flow: discovery, partitioning, transfer, unpack,
//! and sidecar extraction against the in-memory provider fake.

use super::fixtures::{descriptor, query_range, FakeEumetsat, PRODUCT_ID};
use eumetsat_data_downloader::downloader::DownloadManager;
use eumetsat_data_downloader::metadata::MetadataValue;
use eumetsat_data_downloader::shutdown::ShutdownHandle;
use eumetsat_data_downloader::Credentials;
use std::sync::Arc;

fn credentials() -> Credentials {
    Credentials::new("consumer-key", "consumer-secret")
}

#[tokio::test]
async fn test_download_range_end_to_end() {
    let datasets = vec![descriptor(4), descriptor(9), descriptor(14)];
    let api = Arc::new(FakeEumetsat::new(datasets.clone()));
    let data_dir = tempfile::TempDir::new().unwrap();

    let manager = DownloadManager::new(api.clone(), credentials(), data_dir.path());
    let (start, end) = query_range();
    let outcome = manager.download_range(start, end, PRODUCT_ID).await.unwrap();

    assert_eq!(outcome.summary.queried, 3);
    assert_eq!(outcome.summary.downloaded, 3);
    assert_eq!(outcome.summary.failed, 0);
    assert_eq!(outcome.records.len(), 3);
    assert!(outcome.failures.is_empty());

    // Every record carries the typed schema fields.
    for record in &outcome.records {
        assert_eq!(
            record["platform_short_name"],
            MetadataValue::Str("MSG3".to_string())
        );
        assert_eq!(record["file_size"], MetadataValue::Int(102_210));
    }

    // Payloads land in the archive directory; sidecars never do.
    for dataset in &datasets {
        assert!(data_dir.path().join(format!("{}.nat", dataset.id)).is_file());
    }
    assert!(!data_dir.path().join("EOPMetadata.xml").exists());
    assert!(!data_dir.path().join("manifest.xml").exists());
}

#[tokio::test]
async fn test_second_run_skips_everything_local() {
    let datasets = vec![descriptor(4), descriptor(9)];
    let api = Arc::new(FakeEumetsat::new(datasets.clone()));
    let data_dir = tempfile::TempDir::new().unwrap();

    let manager = DownloadManager::new(api.clone(), credentials(), data_dir.path());
    let first = manager.download_datasets(datasets.clone()).await.unwrap();
    assert_eq!(first.summary.downloaded, 2);

    let second = manager.download_datasets(datasets).await.unwrap();
    assert_eq!(second.summary.downloaded, 0);
    assert_eq!(second.summary.skipped_local, 2);
    assert!(second.records.is_empty());
}

#[tokio::test]
async fn test_per_dataset_failure_does_not_abort_the_batch() {
    let datasets = vec![descriptor(4), descriptor(9), descriptor(14)];
    let failing_id = datasets[1].id.clone();
    let api = Arc::new(FakeEumetsat::new(datasets.clone()).failing_on(&failing_id));
    let data_dir = tempfile::TempDir::new().unwrap();

    let manager = DownloadManager::new(api.clone(), credentials(), data_dir.path())
        .with_concurrency(1);
    let outcome = manager.download_datasets(datasets).await.unwrap();

    assert_eq!(outcome.summary.downloaded, 2);
    assert_eq!(outcome.summary.failed, 1);
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].dataset_id, failing_id);

    // The failed dataset left nothing behind and stays eligible for the
    // next run.
    assert!(!data_dir
        .path()
        .join(format!("{failing_id}.nat"))
        .exists());
}

#[tokio::test]
async fn test_shutdown_skips_pending_datasets() {
    let datasets = vec![descriptor(4), descriptor(9)];
    let api = Arc::new(FakeEumetsat::new(datasets.clone()));
    let data_dir = tempfile::TempDir::new().unwrap();

    let shutdown = ShutdownHandle::new();
    shutdown.request();

    let manager = DownloadManager::new(api.clone(), credentials(), data_dir.path())
        .with_shutdown(shutdown);
    let outcome = manager.download_datasets(datasets).await.unwrap();

    assert_eq!(outcome.summary.downloaded, 0);
    assert_eq!(outcome.summary.cancelled, 2);
    assert_eq!(api.download_requests(), 0);
}

#[tokio::test]
async fn test_stale_sidecars_are_swept_before_the_run() {
    let datasets = vec![descriptor(4)];
    let api = Arc::new(FakeEumetsat::new(datasets.clone()));
    let data_dir = tempfile::TempDir::new().unwrap();

    // Leftovers from a hypothetical interrupted run.
    std::fs::write(data_dir.path().join("EOPMetadata.xml"), "<stale/>").unwrap();
    std::fs::write(data_dir.path().join("manifest.xml"), "<stale/>").unwrap();

    let manager = DownloadManager::new(api, credentials(), data_dir.path());
    let outcome = manager.download_datasets(datasets).await.unwrap();

    assert_eq!(outcome.summary.downloaded, 1);
    assert!(!data_dir.path().join("EOPMetadata.xml").exists());
    assert!(!data_dir.path().join("manifest.xml").exists());
}
