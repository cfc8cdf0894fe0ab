//! Repository references given on the command line.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("not a GitHub repository reference: {input:?} (expected owner/name or a github.com URL)")]
pub struct RepoRefError {
    pub input: String,
}

/// `owner/name` of a single repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse any of:
    ///
    /// - `https://github.com/owner/name` (trailing path segments ignored)
    /// - `github.com/owner/name` or `github.com/owner/name.git`
    /// - `git@github.com:owner/name.git`
    /// - `owner/name`
    pub fn parse(input: &str) -> Result<Self, RepoRefError> {
        let err = || RepoRefError {
            input: input.to_string(),
        };
        let trimmed = input.trim();

        let path = if let Some(rest) = trimmed.strip_prefix("git@github.com:") {
            rest.to_string()
        } else if trimmed.contains("://") {
            let url = url::Url::parse(trimmed).map_err(|_| err())?;
            match url.host_str() {
                Some("github.com" | "www.github.com") => url.path().to_string(),
                _ => return Err(err()),
            }
        } else if let Some(rest) = trimmed
            .strip_prefix("github.com/")
            .or_else(|| trimmed.strip_prefix("www.github.com/"))
        {
            rest.to_string()
        } else {
            trimmed.to_string()
        };

        let mut segments = path.trim_matches('/').split('/');
        let owner = segments.next().unwrap_or_default();
        let name = segments.next().unwrap_or_default();
        let name = name.strip_suffix(".git").unwrap_or(name);

        // A bare `owner/name` may not carry extra segments
        let is_bare = !trimmed.contains("github.com");
        if is_bare && segments.next().is_some() {
            return Err(err());
        }

        if !is_valid_segment(owner) || !is_valid_segment(name) {
            return Err(err());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl FromStr for RepoRef {
    type Err = RepoRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
