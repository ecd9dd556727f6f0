//! Download configuration constants

/// Product downloaded when none is specified on the command line.
pub const DEFAULT_PRODUCT_ID: &str = "EO:EUM:DAT:MSG:MSG15-RSS";

/// Default number of parallel dataset workers.
/// Each worker holds one full granule (~100 MB) in memory while unpacking,
/// so the default stays modest.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Upper bound on parallel dataset workers to keep memory use and provider
/// load within reason.
pub const MAX_CONCURRENCY: usize = 16;

/// Number of hyphen-delimited tokens in the fixed-width dataset-id prefix
/// used for local and bucket membership matching.
pub const ID_PREFIX_TOKENS: usize = 6;

/// Clamp a requested worker count into the supported range.
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(1, MAX_CONCURRENCY)
}
