//! Download manager
//!
//! Drives the end-to-end date-range download: discovery, partitioning
//! against local and bucket state, and per-dataset retrieval on a bounded
//! worker pool. Each dataset's pipeline - link resolution, transfer, unpack,
//! sidecar extraction - touches only that dataset's files, so workers are
//! independent; the only shared mutable state is the access token behind the
//! single-flight [`TokenManager`].

use crate::api::token::TokenManager;
use crate::api::{search, DataApi};
use crate::downloader::config::{clamp_concurrency, DEFAULT_CONCURRENCY};
use crate::downloader::{
    partition, DatasetFailure, DownloadError, DownloadOutcome, RunSummary,
};
use crate::metadata::{self, MetadataRecord, MANIFEST_FILENAME, SIDECAR_FILENAME};
use crate::shutdown::ShutdownHandle;
use crate::storage::ObjectStore;
use crate::{Credentials, DatasetDescriptor};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

/// Orchestrates dataset downloads from the EUMETSAT API.
pub struct DownloadManager {
    api: Arc<dyn DataApi>,
    tokens: TokenManager,
    data_dir: PathBuf,
    bucket: Option<ObjectStore>,
    concurrency: usize,
    shutdown: Option<ShutdownHandle>,
    progress: Option<ProgressBar>,
}

impl DownloadManager {
    /// Create a manager writing raw datasets into `data_dir`.
    pub fn new(
        api: Arc<dyn DataApi>,
        credentials: Credentials,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        let tokens = TokenManager::new(api.clone(), credentials);
        Self {
            api,
            tokens,
            data_dir: data_dir.into(),
            bucket: None,
            concurrency: DEFAULT_CONCURRENCY,
            shutdown: None,
            progress: None,
        }
    }

    /// Also skip datasets whose prefix is already present in this bucket.
    pub fn with_bucket(mut self, bucket: ObjectStore) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Set the number of parallel dataset workers (clamped to the supported
    /// range).
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = clamp_concurrency(workers);
        self
    }

    /// Attach a shutdown handle; pending datasets are skipped once it fires.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Attach a progress bar, advanced once per attempted dataset.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_requested())
            .unwrap_or(false)
    }

    /// Download every dataset of `product_id` in the date range.
    ///
    /// Composes discovery, partitioning, and per-id download. Returns the
    /// metadata records of the datasets retrieved in this run plus the
    /// summary counters and failure report.
    pub async fn download_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        product_id: &str,
    ) -> Result<DownloadOutcome, DownloadError> {
        info!(
            product_id,
            start = %start,
            end = %end,
            "Starting date-range download"
        );

        let datasets = search::discover(self.api.as_ref(), product_id, start, end).await?;
        info!(datasets = datasets.len(), "Discovery complete");

        self.download_datasets(datasets).await
    }

    /// Download a previously discovered dataset list.
    pub async fn download_datasets(
        &self,
        mut datasets: Vec<DatasetDescriptor>,
    ) -> Result<DownloadOutcome, DownloadError> {
        std::fs::create_dir_all(&self.data_dir)?;
        remove_stale_sidecars(&self.data_dir);

        // Mint the token up front so bad credentials abort the run instead
        // of failing every dataset individually.
        self.tokens.current().await?;

        datasets.sort_by(|a, b| a.id.cmp(&b.id));
        let dataset_ids: Vec<String> = datasets.iter().map(|d| d.id.clone()).collect();

        let local_listing = self.local_listing()?;
        let bucket_listing = match &self.bucket {
            Some(store) => Some(store.list_keys().await?),
            None => None,
        };

        let split = partition(&dataset_ids, &local_listing, bucket_listing.as_deref());
        info!(
            queried = dataset_ids.len(),
            in_bucket = split.already_in_bucket.len(),
            local = split.already_local.len(),
            to_download = split.to_download.len(),
            "Partitioned datasets against existing state"
        );

        let mut summary = RunSummary {
            queried: dataset_ids.len(),
            skipped_local: split.already_local.len(),
            skipped_bucket: split.already_in_bucket.len(),
            ..RunSummary::default()
        };

        // Windows routinely hold >10,000 ids, so membership checks must not
        // scan the pending list.
        let to_download: HashSet<&str> =
            split.to_download.iter().map(String::as_str).collect();
        let pending: Vec<DatasetDescriptor> = datasets
            .into_iter()
            .filter(|d| to_download.contains(d.id.as_str()))
            .collect();

        if let Some(progress) = &self.progress {
            progress.set_length(pending.len() as u64);
        }

        let results: Vec<(String, Result<MetadataRecord, DownloadError>)> =
            stream::iter(pending.into_iter().map(|descriptor| async move {
                let id = descriptor.id.clone();
                if self.shutdown_requested() {
                    return (id, Err(DownloadError::Cancelled));
                }
                let result = self.download_one(&descriptor).await;
                if let Some(progress) = &self.progress {
                    progress.inc(1);
                }
                (id, result)
            }))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (dataset_id, result) in results {
            match result {
                Ok(record) => {
                    summary.downloaded += 1;
                    records.push(record);
                }
                Err(DownloadError::Cancelled) => {
                    summary.cancelled += 1;
                    debug!(dataset_id, "Dataset skipped due to shutdown request");
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(dataset_id, error = %e, "Dataset failed after retry");
                    failures.push(DatasetFailure {
                        dataset_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        info!(
            downloaded = summary.downloaded,
            skipped_local = summary.skipped_local,
            skipped_bucket = summary.skipped_bucket,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Download run complete"
        );

        Ok(DownloadOutcome {
            records,
            summary,
            failures,
        })
    }

    /// Download one dataset with the single refresh-and-retry auth path.
    ///
    /// On any failure of the first attempt the token is refreshed exactly
    /// once (single-flight across workers) and the transfer retried exactly
    /// once. A second failure is final for this dataset.
    async fn download_one(
        &self,
        descriptor: &DatasetDescriptor,
    ) -> Result<MetadataRecord, DownloadError> {
        let token = self.tokens.current().await?;

        match self.fetch_and_unpack(descriptor, &token).await {
            Ok(record) => Ok(record),
            Err(first_failure) => {
                warn!(
                    dataset_id = %descriptor.id,
                    error = %first_failure,
                    "Transfer failed, refreshing token and retrying once"
                );
                let refreshed = self.tokens.refresh_if_stale(&token).await?;
                self.fetch_and_unpack(descriptor, &refreshed).await
            }
        }
    }

    /// Resolve, transfer, unpack, and extract metadata for one dataset.
    ///
    /// The ZIP container is unpacked into a per-dataset temporary directory
    /// so concurrent workers never collide; payload files are then moved
    /// into the archive directory, overwriting stale copies, while the XML
    /// sidecars are consumed in place and deleted with the temporary
    /// directory. A sidecar can therefore never leak from one dataset into
    /// the next.
    async fn fetch_and_unpack(
        &self,
        descriptor: &DatasetDescriptor,
        token: &str,
    ) -> Result<MetadataRecord, DownloadError> {
        let bytes = self
            .api
            .download_dataset(&descriptor.collection_id, &descriptor.id, token)
            .await?;
        debug!(
            dataset_id = %descriptor.id,
            bytes = bytes.len(),
            "Dataset transferred"
        );

        let temp = TempDir::new_in(&self.data_dir)?;
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_ref()))
            .map_err(|e| DownloadError::Archive(format!("failed to open ZIP: {e}")))?;
        archive
            .extract(temp.path())
            .map_err(|e| DownloadError::Archive(format!("failed to unpack ZIP: {e}")))?;

        let record = metadata::extract_from_dir(temp.path(), &descriptor.collection_id)?;

        for entry in std::fs::read_dir(temp.path())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if name == SIDECAR_FILENAME || name == MANIFEST_FILENAME {
                continue;
            }
            let destination = self.data_dir.join(&name);
            if destination.exists() {
                std::fs::remove_file(&destination)?;
            }
            std::fs::rename(entry.path(), &destination)?;
        }

        Ok(record)
    }

    /// Snapshot of filenames in the archive directory.
    fn local_listing(&self) -> Result<Vec<String>, DownloadError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }
}

/// Delete sidecar files left in the archive directory by an interrupted
/// earlier run.
fn remove_stale_sidecars(data_dir: &Path) {
    for sidecar in [SIDECAR_FILENAME, MANIFEST_FILENAME] {
        let path = data_dir.join(sidecar);
        if path.is_file() {
            match std::fs::remove_file(&path) {
                Ok(_) => debug!(sidecar, "Removed stale sidecar"),
                Err(e) => warn!(sidecar, error = %e, "Failed to remove stale sidecar"),
            }
        }
    }
}
