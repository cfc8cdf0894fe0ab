use crate::rate_limit::RateLimitPolicy;
use crate::retry::RetryConfig;
use crate::search::SearchOptions;

/// Everything that shapes a collection run besides the filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectOptions {
    pub search: SearchOptions,
    pub retry: RetryConfig,
    pub rate_limit: RateLimitPolicy,
}

impl CollectOptions {
    #[must_use]
    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitPolicy) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}
