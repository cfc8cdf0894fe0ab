//! Stargazer - collect GitHub repository search results into flat records.
//!
//! A search is described by [`FilterCriteria`] and [`SearchOptions`]. The
//! [`Collector`] pages through the GitHub search API, enriches each hit with
//! its contributor count and language breakdown, and returns a
//! [`CollectReport`] of [`RepositoryRecord`]s that [`output`] can write as
//! JSON or CSV.
//!
//! # Example
//!
//! ```ignore
//! use stargazer::{CollectOptions, Collector, FilterCriteria, GitHubClient, OutputFormat};
//!
//! let client = GitHubClient::new(stargazer::GITHUB_API_URL, Some(&token), stargazer::DEFAULT_TIMEOUT)?;
//! let filters = FilterCriteria {
//!     language: Some("rust".into()),
//!     stars: Some(">=500".parse()?),
//!     ..Default::default()
//! };
//!
//! let report = Collector::new(&client, CollectOptions::default())
//!     .collect(&filters, None)
//!     .await?;
//! stargazer::output::write_records("repos.json".as_ref(), OutputFormat::Json, &report.records)?;
//! ```

pub mod collect;
pub mod filter;
pub mod github;
pub mod http;
pub mod output;
pub mod rate_limit;
pub mod record;
pub mod retry;
pub mod search;

pub use collect::{
    CollectError, CollectOptions, CollectProgress, CollectReport, Collector, ProgressCallback,
    SkippedRepo,
};
pub use filter::{FilterCriteria, FilterError, Range};
pub use github::{
    DEFAULT_TIMEOUT, GITHUB_API_URL, GitHubClient, GitHubError, RepoRef, RepoRefError,
};
pub use http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
pub use output::{OutputError, OutputFormat};
pub use rate_limit::{ApiRateLimiter, RateLimitInfo, RateLimitPolicy, RateLimitStatus};
pub use record::RepositoryRecord;
pub use retry::RetryConfig;
pub use search::{SearchOptions, SortKey, SortOrder};

/// First line of an error's display text, for progress output.
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}
