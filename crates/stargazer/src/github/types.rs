//! GitHub API data types.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::pagination::LinkPagination;
use crate::rate_limit::{RateLimitInfo, RateLimitStatus};

/// Owner of a repository, as embedded in search items.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// The subset of a search result item (or `GET /repos/{o}/{r}` body) the
/// collector reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchItem {
    pub name: String,
    pub owner: Owner,
    pub stargazers_count: u64,
    pub forks_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    pub default_branch: String,
    #[serde(default)]
    pub description: Option<String>,
    pub pushed_at: DateTime<Utc>,
    pub html_url: String,
}

/// Raw body of `GET /search/repositories`.
///
/// Items stay as JSON values so that one malformed entry does not fail the
/// whole page.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResponse {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<Value>,
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Total number of matches GitHub reports for the query.
    pub total_count: u64,
    /// GitHub timed out and returned a partial result set.
    pub incomplete_results: bool,
    pub items: Vec<Value>,
    pub pagination: LinkPagination,
}

/// Owner and name of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoIdentity {
    pub owner: String,
    pub name: String,
}

impl RepoIdentity {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Pull `owner.login` and `name` out of a raw item.
pub fn item_identity(item: &Value) -> Option<RepoIdentity> {
    let name = item.get("name")?.as_str()?;
    let owner = item.get("owner")?.get("login")?.as_str()?;
    if name.is_empty() || owner.is_empty() {
        return None;
    }
    Some(RepoIdentity {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

/// A single rate limit resource entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResource {
    pub limit: u64,
    #[serde(default)]
    pub used: u64,
    pub remaining: u64,
    /// Unix timestamp when the rate limit resets.
    pub reset: i64,
}

impl RateLimitResource {
    /// Get the reset time as a DateTime.
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset, 0).unwrap_or_else(Utc::now)
    }
}

impl From<&RateLimitResource> for RateLimitInfo {
    fn from(resource: &RateLimitResource) -> Self {
        RateLimitInfo {
            limit: resource.limit,
            remaining: resource.remaining,
            reset_at: resource.reset_at(),
        }
    }
}

/// The resources of `GET /rate_limit` the collector consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRateLimits {
    pub core: RateLimitResource,
    pub search: RateLimitResource,
}

/// Full rate limit response from GitHub's API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRateLimitResponse {
    pub resources: GitHubRateLimits,
}

impl From<&GitHubRateLimitResponse> for RateLimitStatus {
    fn from(response: &GitHubRateLimitResponse) -> Self {
        RateLimitStatus {
            core: (&response.resources.core).into(),
            search: (&response.resources.search).into(),
        }
    }
}
