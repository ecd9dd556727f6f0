//! Idempotent re-download avoidance
//!
//! Dataset ids and archive filenames share a fixed-width provider prefix of
//! six hyphen-delimited alphanumeric tokens
//! (e.g. `MSG3-SEVI-MSG15-0100-NA-20200601120415.883000000Z`). A dataset is
//! already present when that prefix matches a file in the local archive
//! directory or an object name in the cloud bucket. The split is computed
//! fresh on every invocation and never persisted.

use crate::downloader::config::ID_PREFIX_TOKENS;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^([A-Z0-9.]+-){{{ID_PREFIX_TOKENS}}}"))
        .expect("prefix pattern always compiles")
});

/// Extract the fixed-width provider prefix of a dataset id or filename.
///
/// Returns `None` when the name does not carry the provider's six-token
/// shape (e.g. sidecar files).
pub fn id_prefix(name: &str) -> Option<&str> {
    PREFIX_RE
        .find(name)
        .map(|m| m.as_str().trim_end_matches('-'))
}

/// Strict three-way split of a dataset-id set.
///
/// Every input id appears in exactly one of the three lists.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Ids with no local or remote copy
    pub to_download: Vec<String>,
    /// Ids whose prefix matches a file in the archive directory
    pub already_local: Vec<String>,
    /// Ids whose prefix matches a bucket object (empty when no bucket is
    /// configured)
    pub already_in_bucket: Vec<String>,
}

/// Partition dataset ids against the local archive listing and, when a
/// bucket is configured, the bucket object listing.
///
/// Local presence wins over bucket presence so a dataset sitting in both
/// places is still counted exactly once.
pub fn partition(
    dataset_ids: &[String],
    local_listing: &[String],
    bucket_listing: Option<&[String]>,
) -> Partition {
    let local_prefixes: HashSet<&str> =
        local_listing.iter().filter_map(|f| id_prefix(f)).collect();
    let bucket_prefixes: Option<HashSet<&str>> =
        bucket_listing.map(|keys| keys.iter().filter_map(|k| id_prefix(object_basename(k))).collect());

    let mut split = Partition::default();
    for id in dataset_ids {
        let prefix = id_prefix(id);
        let in_local = prefix.is_some_and(|p| local_prefixes.contains(p));
        let in_bucket = prefix.is_some_and(|p| {
            bucket_prefixes
                .as_ref()
                .is_some_and(|prefixes| prefixes.contains(p))
        });

        if in_local {
            split.already_local.push(id.clone());
        } else if in_bucket {
            split.already_in_bucket.push(id.clone());
        } else {
            split.to_download.push(id.clone());
        }
    }
    split
}

/// Final path component of an object key.
fn object_basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
