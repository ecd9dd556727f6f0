//! Command implementations for the downloader CLI

use crate::api::http::EumetsatApi;
use crate::downloader::config::{DEFAULT_CONCURRENCY, DEFAULT_PRODUCT_ID, MAX_CONCURRENCY};
use crate::downloader::DownloadManager;
use crate::pipeline::{compress_directory, upload_directory};
use crate::shutdown::ShutdownHandle;
use crate::storage::ObjectStore;
use crate::Credentials;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use super::CliError;

/// Try to parse a datetime from RFC3339 format.
///
/// Handles both inputs with and without timezone designators:
/// - "2020-06-01T12:00:00Z" - explicit UTC
/// - "2020-06-01T12:00:00+01:00" - explicit offset
/// - "2020-06-01T12:00:00" - no timezone, assumed UTC
fn try_parse_datetime_rfc3339(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}

/// Parse a start time from YYYY-MM-DD or RFC3339 datetime format.
///
/// For date-only format, uses start-of-day (00:00:00 UTC).
fn parse_start_time_flexible(input: &str) -> Result<DateTime<Utc>, CliError> {
    if let Some(dt) = try_parse_datetime_rfc3339(input) {
        return Ok(dt);
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid start time: {e}")))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidArgument("Invalid start time".to_string()))?;
    Ok(datetime.and_utc())
}

/// Parse an end time from YYYY-MM-DD or RFC3339 datetime format.
///
/// For date-only format, uses end-of-day (23:59:59 UTC) so the specified
/// date is fully included.
fn parse_end_time_flexible(input: &str) -> Result<DateTime<Utc>, CliError> {
    if let Some(dt) = try_parse_datetime_rfc3339(input) {
        return Ok(dt);
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid end time: {e}")))?;
    let datetime = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| CliError::InvalidArgument("Invalid end time".to_string()))?;
    Ok(datetime.and_utc())
}

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// EUMETSAT Data Downloader CLI
#[derive(Parser, Debug)]
#[command(name = "eumetsat-data-downloader")]
#[command(about = "Download and archive EUMETSAT satellite imagery products", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Raw archive directory for downloaded datasets
    #[arg(long, global = true, default_value = "data/raw")]
    pub data_dir: PathBuf,

    /// Number of concurrent dataset downloads
    #[arg(long, global = true, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub concurrency: usize,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download datasets for a date range
    Download(DownloadArgs),

    /// Compress raw datasets into the date-partitioned archive
    Compress(CompressArgs),

    /// Mirror the compressed archive to cloud object storage
    Upload(UploadArgs),
}

/// Download command arguments
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// Start time (YYYY-MM-DD format or RFC3339 datetime)
    #[arg(long)]
    pub start_time: String,

    /// End time (YYYY-MM-DD format or RFC3339 datetime)
    #[arg(long)]
    pub end_time: String,

    /// Product id to download
    #[arg(long, default_value = DEFAULT_PRODUCT_ID)]
    pub product_id: String,

    /// EUMETSAT API consumer key
    #[arg(long, env = "EUMETSAT_USER_KEY", hide_env_values = true)]
    pub user_key: String,

    /// EUMETSAT API consumer secret
    #[arg(long, env = "EUMETSAT_USER_SECRET", hide_env_values = true)]
    pub user_secret: String,

    /// Also skip datasets already mirrored to this bucket
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix of mirrored objects in the bucket
    #[arg(long, default_value = "")]
    pub bucket_prefix: String,
}

impl DownloadArgs {
    /// Run the date-range download.
    pub async fn execute(&self, cli: &Cli, shutdown: ShutdownHandle) -> Result<(), CliError> {
        let start = parse_start_time_flexible(&self.start_time)?;
        let end = parse_end_time_flexible(&self.end_time)?;
        if end < start {
            return Err(CliError::InvalidArgument(format!(
                "end time {end} is before start time {start}"
            )));
        }

        let credentials = Credentials::new(&self.user_key, &self.user_secret);
        let api = Arc::new(EumetsatApi::new());
        let mut manager = DownloadManager::new(api, credentials, &cli.data_dir)
            .with_concurrency(cli.concurrency)
            .with_shutdown(shutdown)
            .with_progress(create_progress_bar(&self.product_id));
        if let Some(bucket) = &self.bucket {
            manager = manager.with_bucket(ObjectStore::from_env(bucket, &self.bucket_prefix).await);
        }

        let outcome = manager.download_range(start, end, &self.product_id).await?;

        info!(
            queried = outcome.summary.queried,
            downloaded = outcome.summary.downloaded,
            skipped_local = outcome.summary.skipped_local,
            skipped_bucket = outcome.summary.skipped_bucket,
            failed = outcome.summary.failed,
            cancelled = outcome.summary.cancelled,
            "Download finished"
        );

        if !outcome.failures.is_empty() {
            for failure in &outcome.failures {
                error!(
                    dataset_id = %failure.dataset_id,
                    error = %failure.error,
                    "Dataset not downloaded"
                );
            }
            return Err(CliError::DownloadsFailed {
                failed: outcome.failures.len(),
            });
        }
        Ok(())
    }
}

/// Compress command arguments
#[derive(Parser, Debug)]
pub struct CompressArgs {
    /// Destination root of the date-partitioned compressed archive
    #[arg(long, default_value = "data/compressed")]
    pub compressed_dir: PathBuf,
}

impl CompressArgs {
    /// Compress every raw file in the archive directory.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let placed = compress_directory(&cli.data_dir, &self.compressed_dir).await?;
        info!(artifacts = placed.len(), "Compression finished");
        Ok(())
    }
}

/// Upload command arguments
#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// Root of the date-partitioned compressed archive
    #[arg(long, default_value = "data/compressed")]
    pub compressed_dir: PathBuf,

    /// Destination bucket
    #[arg(long)]
    pub bucket: String,

    /// Key prefix for uploaded objects
    #[arg(long, default_value = "")]
    pub bucket_prefix: String,
}

impl UploadArgs {
    /// Mirror the compressed archive to the bucket.
    pub async fn execute(&self) -> Result<(), CliError> {
        let store = ObjectStore::from_env(&self.bucket, &self.bucket_prefix).await;
        let summary = upload_directory(&self.compressed_dir, &store).await?;
        info!(
            uploaded = summary.uploaded,
            skipped = summary.skipped,
            "Upload finished"
        );
        Ok(())
    }
}

/// Create progress bar with style
fn create_progress_bar(product_id: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .expect("hardcoded template is valid")
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {product_id}"));
    pb
}
