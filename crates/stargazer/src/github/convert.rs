//! Conversion from GitHub API JSON to [`RepositoryRecord`].

use std::collections::BTreeMap;

use serde::Deserialize as _;
use serde_json::Value;
use thiserror::Error;

use super::types::SearchItem;
use crate::record::{RepositoryRecord, language_percentages};

/// Fields a search item must carry to become a record.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "name",
    "owner",
    "stargazers_count",
    "forks_count",
    "default_branch",
    "pushed_at",
    "html_url",
];

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("item is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid item: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Decode a raw search item (or repository body) into a [`SearchItem`].
pub fn decode_item(item: &Value) -> Result<SearchItem, ConvertError> {
    let object = item.as_object().ok_or(ConvertError::NotAnObject)?;

    for field in REQUIRED_FIELDS {
        if object.get(field).is_none_or(Value::is_null) {
            return Err(ConvertError::MissingField(field));
        }
    }
    if item.pointer("/owner/login").is_none_or(Value::is_null) {
        return Err(ConvertError::MissingField("owner.login"));
    }

    Ok(SearchItem::deserialize(item)?)
}

/// Flatten a decoded item plus its secondary lookups into a record.
pub fn to_record(
    item: SearchItem,
    contributors: u64,
    languages: &BTreeMap<String, u64>,
) -> RepositoryRecord {
    RepositoryRecord {
        name: item.name,
        owner: item.owner.login,
        stars: item.stargazers_count,
        forks: item.forks_count,
        watchers: item.watchers_count,
        open_issues: item.open_issues_count,
        contributors,
        languages: language_percentages(languages),
        default_branch: item.default_branch,
        description: item.description.unwrap_or_default(),
        pushed_at: item.pushed_at,
        url: item.html_url,
    }
}
