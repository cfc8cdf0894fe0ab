//! Search collection: paging through results and flattening each hit.
//!
//! # Module Structure
//!
//! - [`engine`] - The [`Collector`] and its page loop
//! - [`options`] - Search, retry and rate-limit settings for a run
//! - [`progress`] - Progress events and the callback type
//! - [`report`] - Results, skipped repositories and errors
//!
//! ```ignore
//! use stargazer::collect::{CollectOptions, Collector};
//!
//! let collector = Collector::new(&client, CollectOptions::default());
//! let report = collector.collect(&filters, None).await?;
//! if let Some(err) = &report.aborted {
//!     eprintln!("stopped early: {err}");
//! }
//! ```

pub mod engine;
pub mod options;
pub mod progress;
pub mod report;

pub use engine::Collector;
pub use options::CollectOptions;
pub use progress::{CollectProgress, ProgressCallback, emit};
pub use report::{CollectError, CollectReport, SkippedRepo};
