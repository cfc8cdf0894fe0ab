use stargazer::collect::CollectProgress;

use super::Summary;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: CollectProgress) {
        match event {
            CollectProgress::SearchStarted {
                query,
                limit,
                per_page,
            } => {
                tracing::info!(query = %query, limit, per_page, "Searching repositories");
            }

            CollectProgress::FetchedPage {
                page,
                count,
                total_so_far,
                total_count,
            } => {
                tracing::info!(page, count, total_so_far, total_count, "Fetched page");
            }

            CollectProgress::RecordCollected { owner, name } => {
                tracing::debug!(repo = %format!("{}/{}", owner, name), "Collected");
            }

            CollectProgress::RepoSkipped { repo, reason } => {
                tracing::warn!(repo = %repo, reason = %reason, "Skipped repository");
            }

            CollectProgress::RateLimited {
                what,
                wait_ms,
                attempt,
                reset_at,
            } => {
                tracing::warn!(
                    what = %what,
                    wait_ms,
                    attempt,
                    reset_at = ?reset_at,
                    "Rate limited, waiting"
                );
            }

            CollectProgress::Retrying {
                what,
                attempt,
                retry_after_ms,
                error,
            } => {
                tracing::warn!(
                    what = %what,
                    attempt,
                    retry_after_ms,
                    error = %error,
                    "Request failed, retrying"
                );
            }

            CollectProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            CollectProgress::CollectComplete {
                records,
                skipped,
                pages,
            } => {
                tracing::info!(records, skipped, pages, "Collection complete");
            }

            _ => {}
        }
    }

    pub fn summary(&self, summary: Summary<'_>) {
        if summary.partial {
            tracing::warn!(
                records = summary.records,
                skipped = summary.skipped,
                path = %summary.path.display(),
                "Wrote partial results"
            );
        } else {
            tracing::info!(
                records = summary.records,
                skipped = summary.skipped,
                path = %summary.path.display(),
                "Wrote results"
            );
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
