//! Rate-limit header parsing, the wait policy for rate-limited requests, and
//! optional proactive pacing.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::http::{HttpHeaders, header_get};

/// Default ceiling on a single rate-limit wait.
pub const DEFAULT_MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

/// Default number of consecutive rate-limit responses tolerated per request.
pub const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Rate limit information reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per period.
    pub limit: u64,
    /// Remaining requests in current period.
    pub remaining: u64,
    /// When the rate limit resets.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitInfo {
    /// Extract rate limit info from `x-ratelimit-*` response headers.
    ///
    /// Returns `None` unless limit, remaining and reset are all present.
    pub fn from_headers(headers: &HttpHeaders) -> Option<Self> {
        let limit = header_get(headers, "x-ratelimit-limit")?
            .trim()
            .parse::<u64>()
            .ok()?;
        let remaining = header_get(headers, "x-ratelimit-remaining")?
            .trim()
            .parse::<u64>()
            .ok()?;
        let reset_at = reset_at_from_headers(headers)?;
        Some(Self {
            limit,
            remaining,
            reset_at,
        })
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Rate limit status for the resources the collector uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub core: RateLimitInfo,
    pub search: RateLimitInfo,
}

/// Parse `x-ratelimit-reset` (epoch seconds).
pub fn reset_at_from_headers(headers: &HttpHeaders) -> Option<DateTime<Utc>> {
    let epoch = header_get(headers, "x-ratelimit-reset")?
        .trim()
        .parse::<i64>()
        .ok()?;
    DateTime::from_timestamp(epoch, 0)
}

/// Parse `retry-after` given in delta seconds.
pub fn retry_after_from_headers(headers: &HttpHeaders) -> Option<Duration> {
    header_get(headers, "retry-after")?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// How long to wait after a rate-limit response, and how many times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Upper bound on any single wait.
    pub max_wait: Duration,
    /// Consecutive rate-limit responses tolerated before giving up.
    pub max_retries: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_RATE_LIMIT_WAIT,
            max_retries: DEFAULT_MAX_RATE_LIMIT_RETRIES,
        }
    }
}

impl RateLimitPolicy {
    /// Wait before retry number `attempt` (1-based).
    ///
    /// Uses `retry_after` when present, else the time until `reset_at` plus
    /// one second, else `2^attempt` seconds. Always capped at `max_wait`.
    #[must_use]
    pub fn wait_for(
        &self,
        reset_at: Option<DateTime<Utc>>,
        retry_after: Option<Duration>,
        attempt: u32,
        now: DateTime<Utc>,
    ) -> Duration {
        let wait = retry_after
            .or_else(|| {
                reset_at.map(|reset| {
                    (reset - now).to_std().unwrap_or_default() + Duration::from_secs(1)
                })
            })
            .unwrap_or_else(|| Duration::from_secs(1u64 << attempt.min(16)));

        wait.min(self.max_wait)
    }
}

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Proactive request pacing using the governor crate.
///
/// ```ignore
/// let limiter = ApiRateLimiter::new(2);
/// limiter.wait().await;
/// client.search_page(&url).await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
    requests_per_second: u32,
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

impl ApiRateLimiter {
    /// Create a limiter allowing `requests_per_second` (0 is treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
            requests_per_second: rps.get(),
        }
    }

    #[must_use]
    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }

    /// Wait until the next request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HttpHeaders {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_rate_limit_headers() {
        let h = headers(&[
            ("X-RateLimit-Limit", "30"),
            ("X-RateLimit-Remaining", "0"),
            ("X-RateLimit-Reset", "1700000000"),
        ]);
        let info = RateLimitInfo::from_headers(&h).expect("info");
        assert_eq!(info.limit, 30);
        assert!(info.is_exhausted());
        assert_eq!(info.reset_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn incomplete_headers_yield_none() {
        let h = headers(&[("x-ratelimit-remaining", "10")]);
        assert!(RateLimitInfo::from_headers(&h).is_none());

        let h = headers(&[
            ("x-ratelimit-limit", "ten"),
            ("x-ratelimit-remaining", "10"),
            ("x-ratelimit-reset", "1"),
        ]);
        assert!(RateLimitInfo::from_headers(&h).is_none());
    }

    #[test]
    fn parses_retry_after_seconds() {
        assert_eq!(
            retry_after_from_headers(&headers(&[("Retry-After", "60")])),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            retry_after_from_headers(&headers(&[("retry-after", "soon")])),
            None
        );
    }

    #[test]
    fn wait_prefers_retry_after() {
        let policy = RateLimitPolicy::default();
        let now = Utc::now();
        let wait = policy.wait_for(
            Some(now + chrono::Duration::seconds(300)),
            Some(Duration::from_secs(7)),
            1,
            now,
        );
        assert_eq!(wait, Duration::from_secs(7));
    }

    #[test]
    fn wait_uses_reset_plus_one_second() {
        let policy = RateLimitPolicy::default();
        let now = Utc::now();
        let wait = policy.wait_for(Some(now + chrono::Duration::seconds(42)), None, 1, now);
        assert_eq!(wait, Duration::from_secs(43));
    }

    #[test]
    fn reset_in_the_past_waits_one_second() {
        let policy = RateLimitPolicy::default();
        let now = Utc::now();
        let wait = policy.wait_for(Some(now - chrono::Duration::seconds(10)), None, 3, now);
        assert_eq!(wait, Duration::from_secs(1));
    }

    #[test]
    fn falls_back_to_exponential_wait() {
        let policy = RateLimitPolicy::default();
        let now = Utc::now();
        assert_eq!(policy.wait_for(None, None, 1, now), Duration::from_secs(2));
        assert_eq!(policy.wait_for(None, None, 3, now), Duration::from_secs(8));
    }

    #[test]
    fn wait_is_capped() {
        let policy = RateLimitPolicy {
            max_wait: Duration::from_secs(60),
            max_retries: 5,
        };
        let now = Utc::now();
        let wait = policy.wait_for(Some(now + chrono::Duration::hours(1)), None, 1, now);
        assert_eq!(wait, Duration::from_secs(60));
        assert_eq!(policy.wait_for(None, None, 30, now), Duration::from_secs(60));
    }

    #[test]
    fn limiter_treats_zero_as_one() {
        assert_eq!(ApiRateLimiter::new(0).requests_per_second(), 1);
        assert_eq!(ApiRateLimiter::new(5).requests_per_second(), 5);
    }

    #[tokio::test]
    async fn limiter_allows_first_request_immediately() {
        let limiter = ApiRateLimiter::new(10);
        limiter.wait().await;
    }
}
