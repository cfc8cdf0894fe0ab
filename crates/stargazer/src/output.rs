//! Writing collected records to JSON or CSV.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::SecondsFormat;
use serde::Deserialize;
use thiserror::Error;

use crate::record::RepositoryRecord;

/// CSV header, in record field order.
pub const CSV_COLUMNS: [&str; 12] = [
    "name",
    "owner",
    "stars",
    "forks",
    "watchers",
    "open_issues",
    "contributors",
    "languages",
    "default_branch",
    "description",
    "pushed_at",
    "url",
];

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Stream(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }

    /// Guess from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }

    /// `repositories.json` or `repositories.csv`.
    pub fn default_path(&self) -> PathBuf {
        PathBuf::from(format!("repositories.{}", self.extension()))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown output format {other:?} (expected json or csv)")),
        }
    }
}

/// Write records as a pretty-printed JSON array.
pub fn write_json<W: Write>(mut writer: W, records: &[RepositoryRecord]) -> Result<(), OutputError> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read back a JSON array written by [`write_json`].
pub fn read_json<R: Read>(reader: R) -> Result<Vec<RepositoryRecord>, OutputError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Quote a CSV field when it contains a delimiter, quote, or line break.
fn escape_csv(field: &str) -> String {
    if !field.contains([',', '"', '\n', '\r']) {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len() + 2);
    out.push('"');
    for ch in field.chars() {
        if ch == '"' {
            out.push_str("\"\"");
        } else {
            out.push(ch);
        }
    }
    out.push('"');
    out
}

/// `Lang:pct;Lang:pct`, sorted by language.
fn format_languages(record: &RepositoryRecord) -> String {
    record
        .languages
        .iter()
        .map(|(language, pct)| format!("{language}:{pct}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn csv_row(record: &RepositoryRecord) -> [String; 12] {
    [
        record.name.clone(),
        record.owner.clone(),
        record.stars.to_string(),
        record.forks.to_string(),
        record.watchers.to_string(),
        record.open_issues.to_string(),
        record.contributors.to_string(),
        format_languages(record),
        record.default_branch.clone(),
        record.description.clone(),
        record.pushed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        record.url.clone(),
    ]
}

/// Write a header row and one row per record.
pub fn write_csv<W: Write>(mut writer: W, records: &[RepositoryRecord]) -> Result<(), OutputError> {
    writeln!(writer, "{}", CSV_COLUMNS.join(","))?;
    for record in records {
        let row: Vec<String> = csv_row(record).iter().map(|f| escape_csv(f)).collect();
        writeln!(writer, "{}", row.join(","))?;
    }
    writer.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and write `records` in `format`.
pub fn write_records(
    path: &Path,
    format: OutputFormat,
    records: &[RepositoryRecord],
) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = File::create(path).map_err(io_err)?;
    let writer = BufWriter::new(file);
    let result = match format {
        OutputFormat::Json => write_json(writer, records),
        OutputFormat::Csv => write_csv(writer, records),
    };

    result.map_err(|e| match e {
        OutputError::Stream(source) => io_err(source),
        other => other,
    })?;

    tracing::debug!(path = %path.display(), %format, count = records.len(), "wrote records");
    Ok(())
}
