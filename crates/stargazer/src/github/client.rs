//! GitHub REST client over the [`HttpTransport`] seam.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::GitHubError;
use super::pagination::parse_link_header;
use super::types::{GitHubRateLimitResponse, SearchPage, SearchResponse};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::rate_limit::{ApiRateLimiter, RateLimitInfo, RateLimitStatus};
use crate::search::SearchOptions;

/// Public GitHub API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// REST API version pinned via `X-GitHub-Api-Version`.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

pub const DEFAULT_USER_AGENT: &str = concat!("stargazer/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub API client.
///
/// Every call is a single GET with no retry; callers wrap calls in
/// [`crate::retry::with_retry`].
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    api_base: String,
    token: Option<String>,
    user_agent: String,
    /// Optional proactive pacing applied before every request.
    pacer: Option<ApiRateLimiter>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("authenticated", &self.token.is_some())
            .field("user_agent", &self.user_agent)
            .field("pacer", &self.pacer)
            .finish()
    }
}

impl GitHubClient {
    /// Create a client for `api_base` backed by reqwest.
    ///
    /// A blank token is treated as no token.
    pub fn new(
        api_base: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, GitHubError> {
        let transport = ReqwestTransport::with_timeout(timeout)
            .map_err(|e| GitHubError::Config(e.to_string()))?;
        Ok(Self::new_with_transport(api_base, token, Arc::new(transport)))
    }

    pub fn new_with_transport(
        api_base: &str,
        token: Option<&str>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
        Self {
            transport,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pacer: None,
        }
    }

    #[must_use]
    pub fn with_pacer(mut self, pacer: ApiRateLimiter) -> Self {
        self.pacer = Some(pacer);
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// URL of page `page` of the repository search for `query`.
    ///
    /// `order` is only sent alongside an explicit `sort`.
    pub fn search_url(&self, query: &str, options: &SearchOptions, page: u32) -> String {
        let mut url = format!(
            "{}/search/repositories?q={}",
            self.api_base,
            urlencoding::encode(query)
        );
        if let Some(sort) = options.sort {
            url.push_str(&format!("&sort={sort}&order={}", options.order));
        }
        url.push_str(&format!("&per_page={}&page={page}", options.page_size()));
        url
    }

    fn repo_url(&self, owner: &str, name: &str, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}{suffix}",
            self.api_base,
            urlencoding::encode(owner),
            urlencoding::encode(name)
        )
    }

    fn request(&self, url: &str) -> HttpRequest {
        let request = HttpRequest::get(url)
            .with_header("Accept", "application/vnd.github+json")
            .with_header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .with_header("User-Agent", self.user_agent.as_str());
        match &self.token {
            Some(token) => request.with_header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    /// Send a GET and classify any non-2xx status.
    async fn get(&self, url: &str) -> Result<HttpResponse, GitHubError> {
        if let Some(pacer) = &self.pacer {
            pacer.wait().await;
        }

        let response = self.transport.send(self.request(url)).await?;

        if let Some(info) = RateLimitInfo::from_headers(&response.headers) {
            tracing::trace!(
                url,
                status = response.status,
                remaining = info.remaining,
                limit = info.limit,
                "GitHub response"
            );
        }

        if (200..300).contains(&response.status) {
            Ok(response)
        } else {
            let err = GitHubError::from_response(url, &response);
            tracing::debug!(url, status = response.status, error = %err, "GitHub request failed");
            Err(err)
        }
    }

    fn decode<T: DeserializeOwned>(url: &str, response: &HttpResponse) -> Result<T, GitHubError> {
        serde_json::from_slice(&response.body).map_err(|source| GitHubError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Fetch one page of search results from a URL built by
    /// [`search_url`](Self::search_url) or taken from a `next` link.
    pub async fn search_page(&self, url: &str) -> Result<SearchPage, GitHubError> {
        let response = self.get(url).await?;
        let pagination = response
            .header("link")
            .map(parse_link_header)
            .unwrap_or_default();
        let body: SearchResponse = Self::decode(url, &response)?;

        Ok(SearchPage {
            total_count: body.total_count,
            incomplete_results: body.incomplete_results,
            items: body.items,
            pagination,
        })
    }

    /// `GET /repos/{owner}/{name}` as raw JSON.
    pub async fn get_repository(&self, owner: &str, name: &str) -> Result<Value, GitHubError> {
        let url = self.repo_url(owner, name, "");
        let response = self.get(&url).await?;
        Self::decode(&url, &response)
    }

    /// Number of contributors, anonymous ones included.
    ///
    /// Requests one contributor per page so the `last` link's page number is
    /// the total. An empty repository answers 204 and counts as zero.
    pub async fn contributor_count(&self, owner: &str, name: &str) -> Result<u64, GitHubError> {
        let url = self.repo_url(owner, name, "/contributors?per_page=1&anon=true");
        let response = self.get(&url).await?;

        if response.status == 204 || response.body.is_empty() {
            return Ok(0);
        }

        if let Some(last) = response
            .header("link")
            .map(parse_link_header)
            .and_then(|p| p.last_page)
        {
            return Ok(u64::from(last));
        }

        let contributors: Vec<Value> = Self::decode(&url, &response)?;
        Ok(contributors.len() as u64)
    }

    /// Bytes of code per language.
    pub async fn languages(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<BTreeMap<String, u64>, GitHubError> {
        let url = self.repo_url(owner, name, "/languages");
        let response = self.get(&url).await?;
        Self::decode(&url, &response)
    }

    /// Current quota for the core and search resources.
    pub async fn rate_limit(&self) -> Result<RateLimitStatus, GitHubError> {
        let url = format!("{}/rate_limit", self.api_base);
        let response = self.get(&url).await?;
        let body: GitHubRateLimitResponse = Self::decode(&url, &response)?;
        Ok(RateLimitStatus::from(&body))
    }
}
