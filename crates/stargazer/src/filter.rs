//! Search filter criteria and query-string construction.
//!
//! GitHub's repository search takes a single `q` parameter made of
//! space-separated qualifiers (`language:rust stars:>500 pushed:>=2024-01-01`).
//! [`FilterCriteria`] holds the qualifiers this tool understands and renders
//! them in a fixed order.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use thiserror::Error;

/// Errors produced while validating filters or building a query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("no search filters configured; at least one is required")]
    Empty,

    #[error("filter `{key}` is present but blank")]
    EmptyValue { key: &'static str },

    #[error("filter `{key}` contains a double quote: {value:?}")]
    QuoteInValue { key: &'static str, value: String },

    #[error("invalid range {value:?}: {reason}")]
    InvalidRange { value: String, reason: String },
}

/// A comparison against a numeric or date qualifier.
///
/// Accepted textual forms: `N`, `>N`, `>=N`, `<N`, `<=N`, `N..M`, `N..*`
/// and `*..N`. The open-ended `..` forms normalize to `AtLeast`/`AtMost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range<T> {
    Exact(T),
    GreaterThan(T),
    AtLeast(T),
    LessThan(T),
    AtMost(T),
    Between(T, T),
}

impl<T: fmt::Display> fmt::Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range::Exact(v) => write!(f, "{v}"),
            Range::GreaterThan(v) => write!(f, ">{v}"),
            Range::AtLeast(v) => write!(f, ">={v}"),
            Range::LessThan(v) => write!(f, "<{v}"),
            Range::AtMost(v) => write!(f, "<={v}"),
            Range::Between(lo, hi) => write!(f, "{lo}..{hi}"),
        }
    }
}

impl<T> FromStr for Range<T>
where
    T: FromStr + PartialOrd,
    T::Err: fmt::Display,
{
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = |reason: String| FilterError::InvalidRange {
            value: s.to_string(),
            reason,
        };
        let bound = |text: &str| -> Result<T, FilterError> {
            let text = text.trim();
            if text.is_empty() {
                return Err(invalid("missing bound".to_string()));
            }
            text.parse::<T>()
                .map_err(|e| invalid(format!("bad bound {text:?}: {e}")))
        };

        if raw.is_empty() {
            return Err(invalid("empty".to_string()));
        }

        if let Some(rest) = raw.strip_prefix(">=") {
            return Ok(Range::AtLeast(bound(rest)?));
        }
        if let Some(rest) = raw.strip_prefix("<=") {
            return Ok(Range::AtMost(bound(rest)?));
        }
        if let Some(rest) = raw.strip_prefix('>') {
            return Ok(Range::GreaterThan(bound(rest)?));
        }
        if let Some(rest) = raw.strip_prefix('<') {
            return Ok(Range::LessThan(bound(rest)?));
        }

        if let Some((lo, hi)) = raw.split_once("..") {
            return match (lo.trim(), hi.trim()) {
                ("*", "*") => Err(invalid("both bounds are open".to_string())),
                ("*", hi) => Ok(Range::AtMost(bound(hi)?)),
                (lo, "*") => Ok(Range::AtLeast(bound(lo)?)),
                (lo, hi) => {
                    let (lo, hi) = (bound(lo)?, bound(hi)?);
                    if lo > hi {
                        Err(invalid("lower bound exceeds upper bound".to_string()))
                    } else {
                        Ok(Range::Between(lo, hi))
                    }
                }
            };
        }

        Ok(Range::Exact(bound(raw)?))
    }
}

impl<'de, T> Deserialize<'de> for Range<T>
where
    T: FromStr + PartialOrd,
    T::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RangeVisitor<T>(PhantomData<T>);

        impl<T> Visitor<'_> for RangeVisitor<T>
        where
            T: FromStr + PartialOrd,
            T::Err: fmt::Display,
        {
            type Value = Range<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a range such as `500`, `>500`, `10..50` or `2020-01-01..*`")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                self.visit_str(&v.to_string())
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                self.visit_str(&v.to_string())
            }
        }

        deserializer.deserialize_any(RangeVisitor(PhantomData))
    }
}

/// User-supplied search constraints.
///
/// Every field is optional; [`FilterCriteria::to_query`] emits one clause per
/// present field in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Free-text terms, emitted first and unqualified.
    pub keywords: Option<String>,
    pub language: Option<String>,
    pub stars: Option<Range<u64>>,
    pub forks: Option<Range<u64>>,
    pub created: Option<Range<NaiveDate>>,
    pub pushed: Option<Range<NaiveDate>>,
    /// Repository size in kilobytes.
    pub size: Option<Range<u64>>,
    /// Restrict to repositories owned by this user or organization.
    pub user: Option<String>,
    pub archived: Option<bool>,
}

impl FilterCriteria {
    /// Render the present filters as GitHub search qualifiers.
    pub fn clauses(&self) -> Result<Vec<String>, FilterError> {
        let mut clauses = Vec::with_capacity(self.clause_count());

        if let Some(keywords) = &self.keywords {
            let keywords = keywords.trim();
            if keywords.is_empty() {
                return Err(FilterError::EmptyValue { key: "keywords" });
            }
            clauses.push(keywords.to_string());
        }
        push_text(&mut clauses, "language", self.language.as_deref())?;
        push_range(&mut clauses, "stars", self.stars.as_ref());
        push_range(&mut clauses, "forks", self.forks.as_ref());
        push_range(&mut clauses, "created", self.created.as_ref());
        push_range(&mut clauses, "pushed", self.pushed.as_ref());
        push_range(&mut clauses, "size", self.size.as_ref());
        push_text(&mut clauses, "user", self.user.as_deref())?;
        if let Some(archived) = self.archived {
            clauses.push(format!("archived:{archived}"));
        }

        Ok(clauses)
    }

    /// Build the `q` parameter for the search endpoint.
    pub fn to_query(&self) -> Result<String, FilterError> {
        let clauses = self.clauses()?;
        if clauses.is_empty() {
            return Err(FilterError::Empty);
        }
        Ok(clauses.join(" "))
    }

    /// Number of clauses [`to_query`](Self::to_query) would emit.
    #[must_use]
    pub fn clause_count(&self) -> usize {
        [
            self.keywords.is_some(),
            self.language.is_some(),
            self.stars.is_some(),
            self.forks.is_some(),
            self.created.is_some(),
            self.pushed.is_some(),
            self.size.is_some(),
            self.user.is_some(),
            self.archived.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clause_count() == 0
    }

    /// Overlay `overrides` on top of `self`, key by key.
    #[must_use]
    pub fn overlay(self, overrides: FilterCriteria) -> FilterCriteria {
        FilterCriteria {
            keywords: overrides.keywords.or(self.keywords),
            language: overrides.language.or(self.language),
            stars: overrides.stars.or(self.stars),
            forks: overrides.forks.or(self.forks),
            created: overrides.created.or(self.created),
            pushed: overrides.pushed.or(self.pushed),
            size: overrides.size.or(self.size),
            user: overrides.user.or(self.user),
            archived: overrides.archived.or(self.archived),
        }
    }
}

fn push_text(
    clauses: &mut Vec<String>,
    key: &'static str,
    value: Option<&str>,
) -> Result<(), FilterError> {
    let Some(value) = value else {
        return Ok(());
    };
    let value = value.trim();
    if value.is_empty() {
        return Err(FilterError::EmptyValue { key });
    }
    if value.contains('"') {
        return Err(FilterError::QuoteInValue {
            key,
            value: value.to_string(),
        });
    }
    if value.chars().any(char::is_whitespace) {
        clauses.push(format!("{key}:\"{value}\""));
    } else {
        clauses.push(format!("{key}:{value}"));
    }
    Ok(())
}

fn push_range<T: fmt::Display>(clauses: &mut Vec<String>, key: &str, value: Option<&Range<T>>) {
    if let Some(range) = value {
        clauses.push(format!("{key}:{range}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn parses_every_range_form() {
        assert_eq!("500".parse::<Range<u64>>(), Ok(Range::Exact(500)));
        assert_eq!(">500".parse::<Range<u64>>(), Ok(Range::GreaterThan(500)));
        assert_eq!(">=500".parse::<Range<u64>>(), Ok(Range::AtLeast(500)));
        assert_eq!("<10".parse::<Range<u64>>(), Ok(Range::LessThan(10)));
        assert_eq!("<=10".parse::<Range<u64>>(), Ok(Range::AtMost(10)));
        assert_eq!("10..50".parse::<Range<u64>>(), Ok(Range::Between(10, 50)));
        assert_eq!("10..*".parse::<Range<u64>>(), Ok(Range::AtLeast(10)));
        assert_eq!("*..10".parse::<Range<u64>>(), Ok(Range::AtMost(10)));
        assert_eq!(" >= 7 ".parse::<Range<u64>>(), Ok(Range::AtLeast(7)));
        assert_eq!(
            "2020-01-01..2021-06-30".parse::<Range<NaiveDate>>(),
            Ok(Range::Between(date("2020-01-01"), date("2021-06-30")))
        );
    }

    #[test]
    fn rejects_malformed_and_inverted_ranges() {
        for bad in ["", ">", "abc", ">=x", "50..10", "*..*", "1..", "..5", "-3"] {
            assert!(
                matches!(
                    bad.parse::<Range<u64>>(),
                    Err(FilterError::InvalidRange { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!("2020-13-01".parse::<Range<NaiveDate>>().is_err());
        assert!("2021-01-01..2020-01-01".parse::<Range<NaiveDate>>().is_err());
    }

    #[test]
    fn range_display_uses_github_syntax() {
        assert_eq!(Range::GreaterThan(500u64).to_string(), ">500");
        assert_eq!(Range::AtMost(1000u64).to_string(), "<=1000");
        assert_eq!(Range::Between(1u64, 5).to_string(), "1..5");
        assert_eq!(
            Range::AtLeast(date("2024-01-01")).to_string(),
            ">=2024-01-01"
        );
    }

    #[test]
    fn default_python_query() {
        let filters = FilterCriteria {
            language: Some("python".to_string()),
            stars: Some(Range::AtLeast(500)),
            ..Default::default()
        };
        assert_eq!(filters.to_query().unwrap(), "language:python stars:>=500");
    }

    #[test]
    fn full_query_uses_fixed_order() {
        let filters = FilterCriteria {
            keywords: Some("web framework".to_string()),
            language: Some("rust".to_string()),
            stars: Some(Range::GreaterThan(500)),
            forks: Some(Range::Between(10, 50)),
            created: Some(Range::AtLeast(date("2020-01-01"))),
            pushed: Some(Range::LessThan(date("2024-06-01"))),
            size: Some(Range::AtMost(1000)),
            user: Some("tokio-rs".to_string()),
            archived: Some(false),
        };
        assert_eq!(
            filters.to_query().unwrap(),
            "web framework language:rust stars:>500 forks:10..50 created:>=2020-01-01 \
             pushed:<2024-06-01 size:<=1000 user:tokio-rs archived:false"
        );
        assert_eq!(filters.clause_count(), 9);
    }

    #[test]
    fn query_contains_exactly_the_present_clauses() {
        let expected: [(&str, String); 9] = [
            ("keywords", "cli".to_string()),
            ("language", "language:go".to_string()),
            ("stars", "stars:>500".to_string()),
            ("forks", "forks:<=3".to_string()),
            ("created", "created:2021-02-03".to_string()),
            ("pushed", "pushed:>2023-01-01".to_string()),
            ("size", "size:10..20".to_string()),
            ("user", "user:octocat".to_string()),
            ("archived", "archived:true".to_string()),
        ];

        for mask in 1u32..(1 << expected.len()) {
            let on = |i: usize| mask & (1 << i) != 0;
            let filters = FilterCriteria {
                keywords: on(0).then(|| "cli".to_string()),
                language: on(1).then(|| "go".to_string()),
                stars: on(2).then_some(Range::GreaterThan(500)),
                forks: on(3).then_some(Range::AtMost(3)),
                created: on(4).then(|| Range::Exact(date("2021-02-03"))),
                pushed: on(5).then(|| Range::GreaterThan(date("2023-01-01"))),
                size: on(6).then_some(Range::Between(10, 20)),
                user: on(7).then(|| "octocat".to_string()),
                archived: on(8).then_some(true),
            };

            let clauses = filters.clauses().unwrap();
            let wanted: Vec<String> = expected
                .iter()
                .enumerate()
                .filter(|(i, _)| on(*i))
                .map(|(_, (_, clause))| clause.clone())
                .collect();

            assert_eq!(clauses, wanted, "mask {mask:#b}");
            assert_eq!(filters.clause_count(), wanted.len());
            assert_eq!(filters.to_query().unwrap(), wanted.join(" "));
        }
    }

    #[test]
    fn empty_criteria_is_rejected() {
        assert_eq!(FilterCriteria::default().to_query(), Err(FilterError::Empty));
        assert!(FilterCriteria::default().is_empty());
    }

    #[test]
    fn blank_and_quoted_values_are_rejected() {
        let blank = FilterCriteria {
            language: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            blank.to_query(),
            Err(FilterError::EmptyValue { key: "language" })
        );

        let quoted = FilterCriteria {
            user: Some("a\"b".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            quoted.to_query(),
            Err(FilterError::QuoteInValue { key: "user", .. })
        ));
    }

    #[test]
    fn values_with_spaces_are_quoted() {
        let filters = FilterCriteria {
            language: Some("Visual Basic .NET".to_string()),
            ..Default::default()
        };
        assert_eq!(filters.to_query().unwrap(), "language:\"Visual Basic .NET\"");
    }

    #[test]
    fn overlay_prefers_overrides_key_by_key() {
        let base = FilterCriteria {
            language: Some("python".to_string()),
            stars: Some(Range::AtLeast(500)),
            ..Default::default()
        };
        let overrides = FilterCriteria {
            stars: Some(Range::GreaterThan(10)),
            user: Some("psf".to_string()),
            ..Default::default()
        };
        let merged = base.overlay(overrides);
        assert_eq!(merged.language.as_deref(), Some("python"));
        assert_eq!(merged.stars, Some(Range::GreaterThan(10)));
        assert_eq!(merged.user.as_deref(), Some("psf"));
    }

    #[test]
    fn deserializes_from_json_strings_and_integers() {
        let filters: FilterCriteria = serde_json::from_str(
            r#"{"language": "rust", "stars": 500, "forks": ">=3", "pushed": "2024-01-01..*"}"#,
        )
        .unwrap();
        assert_eq!(filters.stars, Some(Range::Exact(500)));
        assert_eq!(filters.forks, Some(Range::AtLeast(3)));
        assert_eq!(filters.pushed, Some(Range::AtLeast(date("2024-01-01"))));
        assert!(filters.user.is_none());

        let err = serde_json::from_str::<FilterCriteria>(r#"{"stars": "lots"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid range"));
    }
}
