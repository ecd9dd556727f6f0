//! Bucket mirroring
//!
//! Mirrors the compressed partitioned tree to the bucket. Object keys are
//! the artifacts' paths relative to the tree root, so the bucket layout
//! matches the local `YYYY/MM/DD/HH/MM` partitioning. The remote listing is
//! fetched once per run and artifacts whose key already exists are skipped.

use crate::pipeline::PipelineError;
use crate::storage::ObjectStore;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Counters for one mirroring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Artifacts transferred in this pass
    pub uploaded: usize,
    /// Artifacts skipped because the object already exists
    pub skipped: usize,
}

/// Mirror every compressed artifact under `compressed_dir` to the bucket.
pub async fn upload_directory(
    compressed_dir: &Path,
    store: &ObjectStore,
) -> Result<UploadSummary, PipelineError> {
    let artifacts = enumerate_artifacts(compressed_dir)?;
    let existing: HashSet<String> = store.list_keys().await?.into_iter().collect();
    info!(
        artifacts = artifacts.len(),
        remote_objects = existing.len(),
        bucket = store.bucket(),
        "Starting bucket mirror pass"
    );

    let mut summary = UploadSummary::default();
    for artifact in artifacts {
        let key = relative_key(compressed_dir, &artifact)?;
        if existing.contains(&key) {
            debug!(key, "Object already exists, skipping");
            summary.skipped += 1;
            continue;
        }
        store.upload_file(&artifact, &key).await?;
        summary.uploaded += 1;
    }

    info!(
        uploaded = summary.uploaded,
        skipped = summary.skipped,
        "Bucket mirror pass complete"
    );
    Ok(summary)
}

/// Recursively enumerate `.bz2` artifacts under the tree root, sorted for
/// stable order.
fn enumerate_artifacts(root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut artifacts = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "bz2") {
                artifacts.push(path);
            }
        }
    }
    artifacts.sort();
    Ok(artifacts)
}

/// Object key of an artifact: its path relative to the tree root with `/`
/// separators.
fn relative_key(root: &Path, artifact: &Path) -> Result<String, PipelineError> {
    let relative = artifact.strip_prefix(root).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is outside the compressed tree", artifact.display()),
        )
    })?;
    let components: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(components.join("/"))
}
