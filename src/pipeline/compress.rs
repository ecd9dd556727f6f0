//! Raw file compression
//!
//! Runs every raw `.nat` file in the archive directory through the external
//! `pbzip2` block compressor and moves the resulting artifact into the
//! date-partitioned compressed tree. A non-zero compressor exit status is
//! fatal for the whole batch since every remaining file would fail the same
//! way; a raw file with an unexpected size is logged and compressed anyway
//! because it flags upstream corruption rather than a local problem.

use crate::pipeline::{filename, PipelineError};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Expected size of one uncompressed SEVIRI rapid-scan granule.
pub const NATIVE_FILESIZE_MB: f64 = 102.210_123;

/// Allowed deviation from [`NATIVE_FILESIZE_MB`] before a file is flagged.
pub const FILESIZE_TOLERANCE_MB: f64 = 1.0;

/// Compression level passed to `pbzip2`.
const COMPRESSION_LEVEL: &str = "-5";

/// Compress every raw `.nat` file in `data_dir` into the partitioned tree
/// under `compressed_dir`.
///
/// Returns the destinations of the artifacts placed in this run. Re-running
/// over an already-processed directory overwrites stale artifacts at the
/// same partitioned paths instead of duplicating them.
pub async fn compress_directory(
    data_dir: &Path,
    compressed_dir: &Path,
) -> Result<Vec<PathBuf>, PipelineError> {
    let raw_files = enumerate_raw_files(data_dir)?;
    info!(
        data_dir = %data_dir.display(),
        files = raw_files.len(),
        "Starting compression pass"
    );

    let mut placed = Vec::with_capacity(raw_files.len());
    for raw in raw_files {
        check_expected_size(&raw)?;
        let artifact = run_compressor(&raw).await?;
        let destination = place_artifact(&artifact, compressed_dir)?;
        placed.push(destination);
    }

    info!(
        compressed_dir = %compressed_dir.display(),
        artifacts = placed.len(),
        "Compression pass complete"
    );
    Ok(placed)
}

/// Raw `.nat` files in the flat archive directory, sorted for stable order.
fn enumerate_raw_files(data_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && path.extension().is_some_and(|ext| ext == "nat") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Flag raw files whose size deviates from the expected granule size.
/// Deviation indicates upstream corruption worth surfacing, but the file is
/// still compressed and archived.
fn check_expected_size(raw: &Path) -> Result<(), PipelineError> {
    let size_mb = std::fs::metadata(raw)?.len() as f64 / 1_000_000.0;
    if (size_mb - NATIVE_FILESIZE_MB).abs() > FILESIZE_TOLERANCE_MB {
        warn!(
            file = %raw.display(),
            size_mb,
            expected_mb = NATIVE_FILESIZE_MB,
            "Raw file size deviates from the expected granule size"
        );
    }
    Ok(())
}

/// Run `pbzip2` over one raw file, replacing it with `<file>.bz2`.
async fn run_compressor(raw: &Path) -> Result<PathBuf, PipelineError> {
    debug!(file = %raw.display(), "Compressing");
    let status = Command::new("pbzip2")
        .arg("-f")
        .arg(COMPRESSION_LEVEL)
        .arg(raw)
        .status()
        .await
        .map_err(|e| {
            PipelineError::CompressionEnvironment(format!("failed to launch pbzip2: {e}"))
        })?;

    if !status.success() {
        return Err(PipelineError::CompressionEnvironment(format!(
            "pbzip2 exited with {status} for {}",
            raw.display()
        )));
    }

    let mut artifact = raw.as_os_str().to_owned();
    artifact.push(".bz2");
    Ok(PathBuf::from(artifact))
}

/// Move a compressed artifact into its partitioned destination, overwriting
/// any stale prior copy at the same path.
fn place_artifact(artifact: &Path, compressed_dir: &Path) -> Result<PathBuf, PipelineError> {
    let basename = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PipelineError::UnpartitionableName(artifact.display().to_string()))?;
    let destination = filename::partitioned_destination(compressed_dir, basename)
        .ok_or_else(|| PipelineError::UnpartitionableName(basename.to_string()))?;

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if destination.exists() {
        std::fs::remove_file(&destination)?;
    }
    move_file(artifact, &destination)?;

    debug!(destination = %destination.display(), "Placed compressed artifact");
    Ok(destination)
}

/// Move a file, falling back to copy-then-remove when `rename` fails.
/// The raw and compressed directories are configured independently and may
/// sit on different filesystems, where `rename` returns `EXDEV`.
fn move_file(source: &Path, destination: &Path) -> std::io::Result<()> {
    if std::fs::rename(source, destination).is_ok() {
        return Ok(());
    }
    copy_then_remove(source, destination)
}

fn copy_then_remove(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::copy(source, destination)?;
    std::fs::remove_file(source)
}
