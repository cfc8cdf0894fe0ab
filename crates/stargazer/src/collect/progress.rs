//! Progress events emitted while collecting.

use chrono::{DateTime, Utc};

/// Progress events emitted during a collection run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CollectProgress {
    /// The search is about to request its first page.
    SearchStarted {
        /// The `q` parameter sent to the search endpoint.
        query: String,
        /// Effective result limit.
        limit: u32,
        /// Page size.
        per_page: u32,
    },

    /// Fetched a page of search results.
    FetchedPage {
        /// Page number (1-indexed).
        page: u32,
        /// Number of items on this page.
        count: usize,
        /// Running total of items seen so far.
        total_so_far: usize,
        /// Total matches GitHub reports for the query.
        total_count: u64,
    },

    /// A repository was fully collected.
    RecordCollected { owner: String, name: String },

    /// A repository was left out of the results.
    RepoSkipped {
        /// `owner/name`, or a placeholder when the item was unreadable.
        repo: String,
        reason: String,
    },

    /// Rate limited, waiting before repeating the same request.
    RateLimited {
        /// What was being requested.
        what: String,
        /// Time to wait before retry (ms).
        wait_ms: u64,
        /// Consecutive rate-limit responses for this request.
        attempt: u32,
        /// When the quota resets, if the API said.
        reset_at: Option<DateTime<Utc>>,
    },

    /// A transient failure, backing off before retry.
    Retrying {
        what: String,
        attempt: u32,
        /// Time to wait before retry (ms).
        retry_after_ms: u64,
        error: String,
    },

    /// Warning message (non-fatal).
    Warning { message: String },

    /// Collection finished, successfully or not.
    CollectComplete {
        records: usize,
        skipped: usize,
        pages: u32,
    },
}

/// Callback for progress updates during collection.
pub type ProgressCallback = Box<dyn Fn(CollectProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: CollectProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
