//! Windowed search pagination
//!
//! The search endpoint caps every request at 10,000 results and offers no
//! offset parameter, so progress across a larger result set is made by
//! narrowing the date filter: each page's query ends at the sensing end time
//! of the previous page's last descriptor (results arrive newest-first).
//!
//! Records sharing the boundary instant are returned again by the narrowed
//! query. Pages therefore request one extra overlapping record and the
//! accumulator de-duplicates by dataset id, which is globally unique. The
//! collected count must equal the provider-reported total or discovery fails
//! loudly instead of silently truncating.

use crate::api::{ApiError, ApiResult, DataApi, SearchPage, SearchQuery};
use crate::DatasetDescriptor;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

/// The provider's per-request result cap.
pub const PROVIDER_WINDOW: usize = 10_000;

/// Maximum number of pagination requests before aborting as a loop guard.
const MAX_PAGES: usize = 10_000;

/// Issue one windowed search request.
///
/// `count` is capped at [`PROVIDER_WINDOW`]; the provider rejects larger
/// requests.
pub async fn query(
    api: &dyn DataApi,
    product_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    start_index: usize,
    count: usize,
) -> ApiResult<SearchPage> {
    api.search_page(&SearchQuery {
        product_id: product_id.to_string(),
        start,
        end,
        start_index,
        count: count.min(PROVIDER_WINDOW),
    })
    .await
}

/// Identify every dataset available for the product and date range.
///
/// Restartable: re-running with the same bounds reproduces the same set,
/// modulo provider-side data additions.
///
/// # Errors
/// [`ApiError::PaginationIntegrity`] when the accumulated descriptor count
/// does not reach the provider-reported total, which indicates dropped
/// entries at a window boundary.
pub async fn discover(
    api: &dyn DataApi,
    product_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> ApiResult<Vec<DatasetDescriptor>> {
    discover_with_window(api, product_id, start, end, PROVIDER_WINDOW).await
}

/// Pagination core with an explicit window size (exposed for tests; the
/// provider window is fixed in production).
pub async fn discover_with_window(
    api: &dyn DataApi,
    product_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    window: usize,
) -> ApiResult<Vec<DatasetDescriptor>> {
    let first = query(api, product_id, start, end, 0, window).await?;
    let total = first.total_results;
    debug!(total_results = total, "Initial search page received");

    if total <= window {
        if first.features.len() != total {
            return Err(ApiError::PaginationIntegrity {
                collected: first.features.len(),
                total,
            });
        }
        return Ok(first.features);
    }

    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let mut datasets: Vec<DatasetDescriptor> = Vec::with_capacity(total);
    for descriptor in first.features {
        if seen.insert(descriptor.id.clone()) {
            datasets.push(descriptor);
        }
    }

    let mut pages = 1;
    while datasets.len() < total {
        if pages >= MAX_PAGES {
            return Err(ApiError::PaginationIntegrity {
                collected: datasets.len(),
                total,
            });
        }

        // Narrow the end bound to the oldest record seen so far. The last
        // descriptor is re-requested as the overlap record for tie-breaking.
        let window_end = datasets
            .last()
            .map(|d| d.end)
            .expect("total > window implies a non-empty first page");
        let remaining = total - datasets.len();
        let count = window.min(remaining + 1);

        debug!(
            page = pages + 1,
            collected = datasets.len(),
            remaining,
            "Fetching next search page"
        );

        let page = query(api, product_id, start, window_end, 0, count).await?;

        let before = datasets.len();
        for descriptor in page.features {
            if seen.insert(descriptor.id.clone()) {
                datasets.push(descriptor);
            }
        }

        if datasets.len() == before {
            // A page of pure duplicates means the date filter can no longer
            // make progress; aborting beats silently truncating.
            return Err(ApiError::PaginationIntegrity {
                collected: datasets.len(),
                total,
            });
        }

        pages += 1;
    }

    if datasets.len() != total {
        return Err(ApiError::PaginationIntegrity {
            collected: datasets.len(),
            total,
        });
    }

    debug!(
        pages,
        datasets = datasets.len(),
        "Discovery complete"
    );
    Ok(datasets)
}
