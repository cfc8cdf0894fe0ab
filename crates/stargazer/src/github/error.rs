//! GitHub API error types and response classification.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::http::{HttpError, HttpResponse};
use crate::rate_limit::{reset_at_from_headers, retry_after_from_headers};

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] HttpError),

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Access forbidden: {message}")]
    Forbidden { message: String },

    #[error("Rate limit exceeded{}", describe_rate_limit(.reset_at, .retry_after))]
    RateLimited {
        reset_at: Option<DateTime<Utc>>,
        retry_after: Option<Duration>,
    },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

// Re-export the shared helper alongside the error type
pub use crate::short_error_message;

fn describe_rate_limit(
    reset_at: &Option<DateTime<Utc>>,
    retry_after: &Option<Duration>,
) -> String {
    match (retry_after, reset_at) {
        (Some(after), _) => format!(". Retry after {}s", after.as_secs()),
        (None, Some(reset)) => format!(". Resets at {reset}"),
        (None, None) => String::new(),
    }
}

/// The `{"message": ...}` envelope GitHub uses for error bodies.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn error_message(response: &HttpResponse) -> String {
    serde_json::from_slice::<ErrorBody>(&response.body)
        .map(|b| b.message)
        .unwrap_or_else(|_| {
            let text = response.body_text();
            let text = text.trim();
            if text.is_empty() {
                format!("HTTP {}", response.status)
            } else {
                text.chars().take(200).collect()
            }
        })
}

impl GitHubError {
    /// Classify a non-2xx response for `url`.
    pub fn from_response(url: &str, response: &HttpResponse) -> Self {
        let status = response.status;
        let message = error_message(response);

        match status {
            401 => Self::Auth { message },
            403 | 429 if is_rate_limit_response(response, &message) => Self::RateLimited {
                reset_at: reset_at_from_headers(&response.headers),
                retry_after: retry_after_from_headers(&response.headers),
            },
            403 => Self::Forbidden { message },
            404 => Self::NotFound {
                resource: url.to_string(),
            },
            422 => Self::Validation { message },
            500..=599 => Self::Server { status, message },
            _ => Self::Api { status, message },
        }
    }

    /// Rate-limited; recoverable by waiting.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Worth retrying with backoff.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(HttpError::Transport(_)) | Self::Server { .. }
        )
    }

    /// Credentials are missing, wrong, or lack access.
    #[inline]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Forbidden { .. })
    }

    /// Confined to one repository when raised by a per-repository lookup:
    /// a missing repository, a body that did not decode, or a 403 such as
    /// GitHub's "contributor list is too large".
    #[inline]
    pub fn is_repo_local(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Decode { .. } | Self::Forbidden { .. }
        )
    }
}

fn is_rate_limit_response(response: &HttpResponse, message: &str) -> bool {
    if response
        .header("x-ratelimit-remaining")
        .is_some_and(|v| v.trim() == "0")
    {
        return true;
    }
    if response.header("retry-after").is_some() {
        return true;
    }
    if response.status == 429 {
        return true;
    }
    message.to_ascii_lowercase().contains("rate limit")
}
