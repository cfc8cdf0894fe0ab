//! The flattened per-repository output record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One collected repository.
///
/// Field order here is the column order of the CSV output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub name: String,
    pub owner: String,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    pub contributors: u64,
    /// Share of code per language, in percent rounded to two decimals.
    pub languages: BTreeMap<String, f64>,
    pub default_branch: String,
    /// Empty when the repository has no description.
    pub description: String,
    pub pushed_at: DateTime<Utc>,
    pub url: String,
}

impl RepositoryRecord {
    /// `owner/name`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Convert per-language byte counts into percentages of the total.
pub fn language_percentages(bytes: &BTreeMap<String, u64>) -> BTreeMap<String, f64> {
    let total: u64 = bytes.values().sum();
    if total == 0 {
        return BTreeMap::new();
    }

    bytes
        .iter()
        .map(|(language, &count)| {
            let pct = count as f64 / total as f64 * 100.0;
            (language.clone(), (pct * 100.0).round() / 100.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn single_language_is_one_hundred_percent() {
        let pct = language_percentages(&bytes(&[("Python", 123_456)]));
        assert_eq!(pct.get("Python"), Some(&100.0));
    }

    #[test]
    fn percentages_are_rounded_to_two_decimals() {
        let pct = language_percentages(&bytes(&[("Rust", 2), ("Shell", 1)]));
        assert_eq!(pct.get("Rust"), Some(&66.67));
        assert_eq!(pct.get("Shell"), Some(&33.33));

        let sum: f64 = pct.values().sum();
        assert!((sum - 100.0).abs() < 0.05);
    }

    #[test]
    fn no_languages_or_zero_bytes_is_empty() {
        assert!(language_percentages(&BTreeMap::new()).is_empty());
        assert!(language_percentages(&bytes(&[("Text", 0)])).is_empty());
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let records = vec![
            RepositoryRecord {
                name: "flask".to_string(),
                owner: "pallets".to_string(),
                stars: 66_000,
                forks: 16_000,
                watchers: 66_000,
                open_issues: 7,
                contributors: 712,
                languages: language_percentages(&bytes(&[
                    ("Python", 999_331),
                    ("HTML", 2_141),
                    ("CSS", 17),
                ])),
                default_branch: "main".to_string(),
                description: "The Python micro framework, \"quoted\", with a\nnewline".to_string(),
                pushed_at: "2024-05-01T12:34:56Z".parse().unwrap(),
                url: "https://github.com/pallets/flask".to_string(),
            },
            RepositoryRecord {
                name: "empty".to_string(),
                owner: "nobody".to_string(),
                stars: 0,
                forks: 0,
                watchers: 0,
                open_issues: 0,
                contributors: 0,
                languages: BTreeMap::new(),
                default_branch: "master".to_string(),
                description: String::new(),
                pushed_at: "2010-01-01T00:00:00Z".parse().unwrap(),
                url: "https://github.com/nobody/empty".to_string(),
            },
        ];

        let json = serde_json::to_string(&records).unwrap();
        let back: Vec<RepositoryRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, records);
        assert_eq!(records[0].full_name(), "pallets/flask");
    }
}
