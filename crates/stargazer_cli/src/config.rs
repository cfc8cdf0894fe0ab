//! Configuration file support for stargazer.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `STARGAZER_`, sections split by
//!    `__`, e.g. `STARGAZER_SEARCH__PER_PAGE=50`)
//! 3. The file passed with `--config` (TOML, JSON or YAML by extension)
//! 4. `./stargazer.toml`
//! 5. `~/.config/stargazer/config.toml`
//! 6. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."  # or STARGAZER_GITHUB_TOKEN / GITHUB_TOKEN
//! requests_per_second = 2
//!
//! [search]
//! sort = "stars"
//! order = "desc"
//! per_page = 50
//! limit = 200
//!
//! [filters]
//! language = "rust"
//! stars = ">=1000"
//! pushed = ">=2024-01-01"
//!
//! [retry]
//! max_retries = 3
//! max_rate_limit_wait_secs = 900
//!
//! [output]
//! format = "csv"
//! path = "rust-repos.csv"
//! ```
//!
//! A flat `configs.json` with top-level `language`, `stars`, `per_page`,
//! `sort` and `order` keys is also understood.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use stargazer::rate_limit::{DEFAULT_MAX_RATE_LIMIT_RETRIES, DEFAULT_MAX_RATE_LIMIT_WAIT};
use stargazer::retry::{DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, DEFAULT_MIN_DELAY};
use stargazer::search::{DEFAULT_LIMIT, DEFAULT_PER_PAGE};
use stargazer::{
    FilterCriteria, OutputFormat, Range, RateLimitPolicy, RetryConfig, SearchOptions, SortKey,
    SortOrder,
};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub search: SearchConfig,
    /// Search filters. When absent the search defaults to popular Python
    /// repositories.
    pub filters: Option<FilterCriteria>,
    pub retry: RetrySettings,
    pub output: OutputConfig,

    // Flat keys from the older JSON config layout
    pub language: Option<String>,
    pub stars: Option<Range<u64>>,
    pub per_page: Option<u32>,
    pub sort: Option<SortKey>,
    pub order: Option<SortOrder>,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token.
    /// Can also be set via STARGAZER_GITHUB_TOKEN or GITHUB_TOKEN.
    pub token: Option<String>,
    /// API base URL, for GitHub Enterprise or testing.
    pub api_url: String,
    pub timeout_secs: u64,
    /// Proactive pacing. Unset means no pacing.
    pub requests_per_second: Option<u32>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: stargazer::GITHUB_API_URL.to_string(),
            timeout_secs: stargazer::DEFAULT_TIMEOUT.as_secs(),
            requests_per_second: None,
        }
    }
}

/// Search paging and ordering.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub sort: Option<SortKey>,
    pub order: Option<SortOrder>,
    pub per_page: Option<u32>,
    pub limit: Option<u32>,
}

/// Retry and rate-limit settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_rate_limit_wait_secs: u64,
    pub max_rate_limit_retries: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay_ms: DEFAULT_MIN_DELAY.as_millis() as u64,
            max_delay_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
            max_rate_limit_wait_secs: DEFAULT_MAX_RATE_LIMIT_WAIT.as_secs(),
            max_rate_limit_retries: DEFAULT_MAX_RATE_LIMIT_RETRIES,
        }
    }
}

/// Where and how to write results.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Defaults to `repositories.<format>`.
    pub path: Option<PathBuf>,
}

/// Filters used when no `[filters]` table is configured.
pub fn default_filters() -> FilterCriteria {
    FilterCriteria {
        language: Some("python".to_string()),
        stars: Some(Range::AtLeast(500)),
        ..Default::default()
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. XDG config file (~/.config/stargazer/config.toml)
    /// 2. Local config file (./stargazer.toml)
    /// 3. `explicit`, which must exist
    /// 4. Environment variables with STARGAZER_ prefix
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("stargazer.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./stargazer.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // Format inferred from the extension
        if let Some(path) = explicit {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // e.g. STARGAZER_SEARCH__PER_PAGE -> search.per_page
        builder = builder.add_source(
            Environment::with_prefix("STARGAZER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Get the GitHub token: config, then STARGAZER_GITHUB_TOKEN, then GITHUB_TOKEN.
    pub fn github_token(&self) -> Option<String> {
        self.resolve_token(|key| std::env::var(key).ok())
    }

    fn resolve_token(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.github
            .token
            .clone()
            .or_else(|| env("STARGAZER_GITHUB_TOKEN"))
            .or_else(|| env("GITHUB_TOKEN"))
            .filter(|t| !t.trim().is_empty())
    }

    /// Configured filters, with legacy flat keys filling unset fields.
    pub fn filters(&self) -> FilterCriteria {
        let legacy = FilterCriteria {
            language: self.language.clone(),
            stars: self.stars,
            ..Default::default()
        };
        match &self.filters {
            Some(filters) => legacy.overlay(filters.clone()),
            None => default_filters().overlay(legacy),
        }
    }

    /// Search settings; results are ordered by stars unless a sort is configured.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            sort: Some(self.search.sort.or(self.sort).unwrap_or(SortKey::Stars)),
            order: self.search.order.or(self.order).unwrap_or_default(),
            per_page: self
                .search
                .per_page
                .or(self.per_page)
                .unwrap_or(DEFAULT_PER_PAGE),
            limit: self.search.limit.unwrap_or(DEFAULT_LIMIT),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            Duration::from_millis(self.retry.min_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
            self.retry.max_retries,
        )
    }

    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_wait: Duration::from_secs(self.retry.max_rate_limit_wait_secs),
            max_retries: self.retry.max_rate_limit_retries,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.github.timeout_secs)
    }

    /// Configured output path, or `repositories.<format>`.
    pub fn output_path(&self, format: OutputFormat) -> PathBuf {
        self.output
            .path
            .clone()
            .unwrap_or_else(|| format.default_path())
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "stargazer").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
