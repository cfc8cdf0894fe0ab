//! Retry handling for GitHub requests.
//!
//! Two independent budgets apply to every request:
//!
//! - transient failures (transport errors, 5xx) are retried with exponential
//!   backoff and jitter via `backon`;
//! - rate-limit responses wait out the quota window per [`RateLimitPolicy`]
//!   and then repeat the same request.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;

use crate::collect::progress::{CollectProgress, ProgressCallback, emit};
use crate::github::GitHubError;
use crate::github::error::short_error_message;
use crate::rate_limit::RateLimitPolicy;

pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Configuration for transient-failure retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Run `operation` until it succeeds or fails for good.
///
/// `what` names the request in progress events and logs. Errors that are
/// neither transient nor rate limits are returned on first occurrence.
pub async fn with_retry<T, F, Fut>(
    what: &str,
    mut operation: F,
    config: &RetryConfig,
    policy: &RateLimitPolicy,
    on_progress: Option<&ProgressCallback>,
) -> Result<T, GitHubError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubError>>,
{
    let mut rate_limited = 0u32;

    loop {
        // Track attempt number for progress reporting
        let attempt = AtomicU32::new(0);
        let retry_op = || {
            attempt.fetch_add(1, Ordering::SeqCst);
            operation()
        };

        let result = retry_op
            .retry(config.clone().into_backoff())
            .notify(|err: &GitHubError, dur: Duration| {
                let current_attempt = attempt.load(Ordering::SeqCst);
                emit(
                    on_progress,
                    CollectProgress::Retrying {
                        what: what.to_string(),
                        attempt: current_attempt,
                        retry_after_ms: dur.as_millis() as u64,
                        error: short_error_message(err),
                    },
                );
                tracing::debug!(
                    what,
                    attempt = current_attempt,
                    delay_ms = dur.as_millis() as u64,
                    error = %short_error_message(err),
                    "transient failure, retrying"
                );
            })
            .when(GitHubError::is_transient)
            .await;

        match result {
            Err(GitHubError::RateLimited {
                reset_at,
                retry_after,
            }) => {
                rate_limited += 1;
                if rate_limited > policy.max_retries {
                    tracing::warn!(
                        what,
                        attempts = rate_limited,
                        "rate limit retries exhausted"
                    );
                    return Err(GitHubError::RateLimited {
                        reset_at,
                        retry_after,
                    });
                }

                let wait = policy.wait_for(reset_at, retry_after, rate_limited, Utc::now());
                emit(
                    on_progress,
                    CollectProgress::RateLimited {
                        what: what.to_string(),
                        wait_ms: wait.as_millis() as u64,
                        attempt: rate_limited,
                        reset_at,
                    },
                );
                tracing::warn!(
                    what,
                    attempt = rate_limited,
                    wait_secs = wait.as_secs(),
                    "rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            }
            other => return other,
        }
    }
}
