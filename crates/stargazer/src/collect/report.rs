//! Collection results and errors.

use thiserror::Error;

use crate::filter::FilterError;
use crate::github::{ConvertError, GitHubError, RepoIdentity};
use crate::record::RepositoryRecord;

/// Errors that end a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Invalid filters: {0}")]
    Filter(#[from] FilterError),

    /// Bad, missing, or insufficiently privileged credentials.
    #[error("GitHub rejected the credentials: {0}")]
    Auth(#[source] GitHubError),

    #[error("Failed to fetch {what}: {source}")]
    Request {
        what: String,
        #[source]
        source: GitHubError,
    },

    #[error("Failed to convert {repo}: {source}")]
    Convert {
        repo: String,
        #[source]
        source: ConvertError,
    },
}

impl CollectError {
    /// Route a request failure: credential problems become [`CollectError::Auth`].
    pub fn from_request(what: impl Into<String>, source: GitHubError) -> Self {
        if source.is_auth() {
            Self::Auth(source)
        } else {
            Self::Request {
                what: what.into(),
                source,
            }
        }
    }

    /// Like [`from_request`](Self::from_request), for lookups against one
    /// repository: only a 401 counts as a credential failure there.
    pub fn from_repo_request(what: impl Into<String>, source: GitHubError) -> Self {
        if source.is_repo_local() {
            Self::Request {
                what: what.into(),
                source,
            }
        } else {
            Self::from_request(what, source)
        }
    }

    #[inline]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// A repository left out of the results, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRepo {
    /// Absent when the search item itself was unreadable.
    pub repo: Option<RepoIdentity>,
    pub reason: String,
}

impl SkippedRepo {
    /// `owner/name`, or a placeholder for unidentifiable items.
    pub fn label(&self) -> String {
        self.repo
            .as_ref()
            .map_or_else(|| "<unidentified item>".to_string(), RepoIdentity::full_name)
    }
}

/// Outcome of a search collection.
///
/// `aborted` is set when the run stopped early on a fatal error; `records`
/// then holds everything collected before that point.
#[derive(Debug)]
pub struct CollectReport {
    pub query: String,
    pub records: Vec<RepositoryRecord>,
    pub skipped: Vec<SkippedRepo>,
    /// Distinct search pages fetched (retries not counted).
    pub pages_fetched: u32,
    /// Total matches reported by the last page fetched.
    pub total_count: Option<u64>,
    pub aborted: Option<CollectError>,
}

impl CollectReport {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            records: Vec::new(),
            skipped: Vec::new(),
            pages_fetched: 0,
            total_count: None,
            aborted: None,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}
