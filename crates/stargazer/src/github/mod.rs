//! GitHub REST API access.
//!
//! # Module Structure
//!
//! - [`error`] - Error types and response classification
//! - [`types`] - Wire types for search results and rate limits
//! - [`client`] - The client and its endpoints
//! - [`pagination`] - Link header parsing
//! - [`convert`] - Search items to [`RepositoryRecord`](crate::RepositoryRecord)
//! - [`repo`] - Parsing repository references
//!
//! ```ignore
//! use stargazer::github::{GitHubClient, GITHUB_API_URL};
//!
//! let client = GitHubClient::new(GITHUB_API_URL, Some(&token), DEFAULT_TIMEOUT)?;
//! let page = client.search_page(&client.search_url("language:rust", &options, 1)).await?;
//! ```

pub mod client;
pub mod convert;
pub mod error;
pub mod pagination;
pub mod repo;
pub mod types;

pub use client::{
    DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, GITHUB_API_URL, GITHUB_API_VERSION, GitHubClient,
};
pub use convert::{ConvertError, decode_item, to_record};
pub use error::GitHubError;
pub use pagination::{LinkPagination, parse_link_header};
pub use repo::{RepoRef, RepoRefError};
pub use types::{RepoIdentity, SearchItem, SearchPage, item_identity};
