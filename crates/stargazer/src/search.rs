//! Search ordering and paging options.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// GitHub stops serving search results past this many per query.
pub const SEARCH_RESULT_CAP: u32 = 1000;

/// Largest page size the search endpoint accepts.
pub const MAX_PER_PAGE: u32 = 100;

pub const DEFAULT_PER_PAGE: u32 = 30;

pub const DEFAULT_LIMIT: u32 = 100;

/// Sort key for repository search. Absent means best match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    Stars,
    Forks,
    HelpWantedIssues,
    Updated,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Stars => "stars",
            SortKey::Forks => "forks",
            SortKey::HelpWantedIssues => "help-wanted-issues",
            SortKey::Updated => "updated",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stars" => Ok(SortKey::Stars),
            "forks" => Ok(SortKey::Forks),
            "help-wanted-issues" => Ok(SortKey::HelpWantedIssues),
            "updated" => Ok(SortKey::Updated),
            other => Err(format!(
                "unknown sort key {other:?} (expected stars, forks, help-wanted-issues or updated)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order {other:?} (expected asc or desc)")),
        }
    }
}

/// How results are ordered and how many are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub sort: Option<SortKey>,
    pub order: SortOrder,
    /// Requested page size. See [`SearchOptions::page_size`].
    pub per_page: u32,
    /// Requested result limit. See [`SearchOptions::effective_limit`].
    pub limit: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            sort: None,
            order: SortOrder::default(),
            per_page: DEFAULT_PER_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchOptions {
    /// Page size clamped to `1..=100`.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    /// The limit, at least 1 and never above the search cap.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, SEARCH_RESULT_CAP)
    }

    /// Upper bound on distinct page requests for one search.
    #[must_use]
    pub fn max_pages(&self) -> u32 {
        self.effective_limit().div_ceil(self.page_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = SearchOptions::default();
        assert_eq!(options.sort, None);
        assert_eq!(options.order, SortOrder::Desc);
        assert_eq!(options.page_size(), 30);
        assert_eq!(options.effective_limit(), 100);
        assert_eq!(options.max_pages(), 4);
    }

    #[test]
    fn page_size_is_clamped() {
        let mut options = SearchOptions {
            per_page: 0,
            ..Default::default()
        };
        assert_eq!(options.page_size(), 1);
        options.per_page = 250;
        assert_eq!(options.page_size(), 100);
    }

    #[test]
    fn limit_is_capped_at_search_maximum() {
        let options = SearchOptions {
            per_page: 100,
            limit: 5000,
            ..Default::default()
        };
        assert_eq!(options.effective_limit(), 1000);
        assert_eq!(options.max_pages(), 10);

        let zero = SearchOptions {
            limit: 0,
            ..Default::default()
        };
        assert_eq!(zero.effective_limit(), 1);
        assert_eq!(zero.max_pages(), 1);
    }

    #[test]
    fn max_pages_rounds_up() {
        let options = SearchOptions {
            per_page: 30,
            limit: 61,
            ..Default::default()
        };
        assert_eq!(options.max_pages(), 3);
    }

    #[test]
    fn parses_sort_keys_and_orders() {
        assert_eq!("stars".parse::<SortKey>(), Ok(SortKey::Stars));
        assert_eq!(
            "help-wanted-issues".parse::<SortKey>(),
            Ok(SortKey::HelpWantedIssues)
        );
        assert!("popularity".parse::<SortKey>().is_err());
        assert_eq!("ASC".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert!("up".parse::<SortOrder>().is_err());

        let key: SortKey = serde_json::from_str("\"help-wanted-issues\"").unwrap();
        assert_eq!(key.to_string(), "help-wanted-issues");
        let order: SortOrder = serde_json::from_str("\"asc\"").unwrap();
        assert_eq!(order, SortOrder::Asc);
    }
}
