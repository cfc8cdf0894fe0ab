//! The collection loop.
//!
//! One request is in flight at a time: a search page, then for each item on
//! it the contributor count and the language breakdown, in order.

use std::collections::BTreeMap;
use std::future::Future;

use serde_json::Value;

use super::options::CollectOptions;
use super::progress::{CollectProgress, ProgressCallback, emit};
use super::report::{CollectError, CollectReport, SkippedRepo};
use crate::filter::FilterCriteria;
use crate::github::error::short_error_message;
use crate::github::{
    GitHubClient, GitHubError, RepoIdentity, RepoRef, decode_item, item_identity, to_record,
};
use crate::record::RepositoryRecord;
use crate::retry::with_retry;

/// What happened to one search item.
enum ItemOutcome {
    Collected(RepositoryRecord),
    Skipped(SkippedRepo),
    /// Stops the run. Carries what was being fetched.
    Fatal(String, GitHubError),
}

/// Runs searches and single-repository lookups against a [`GitHubClient`].
pub struct Collector<'a> {
    client: &'a GitHubClient,
    options: CollectOptions,
}

impl<'a> Collector<'a> {
    pub fn new(client: &'a GitHubClient, options: CollectOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &CollectOptions {
        &self.options
    }

    async fn request<T, F, Fut>(
        &self,
        what: &str,
        operation: F,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<T, GitHubError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitHubError>>,
    {
        with_retry(
            what,
            operation,
            &self.options.retry,
            &self.options.rate_limit,
            on_progress,
        )
        .await
    }

    /// Search for repositories matching `filters` and collect each one.
    ///
    /// Returns `Err` only for invalid filters and credential failures. Any
    /// other fatal error after the search started is stored in
    /// [`CollectReport::aborted`] next to the records gathered so far.
    pub async fn collect(
        &self,
        filters: &FilterCriteria,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<CollectReport, CollectError> {
        let query = filters.to_query()?;
        let search = &self.options.search;
        let limit = search.effective_limit() as usize;
        let max_pages = search.max_pages();

        emit(
            on_progress,
            CollectProgress::SearchStarted {
                query: query.clone(),
                limit: search.effective_limit(),
                per_page: search.page_size(),
            },
        );
        tracing::info!(
            query = %query,
            limit,
            per_page = search.page_size(),
            "starting repository search"
        );

        let mut report = CollectReport::new(query.as_str());
        let mut cursor = self.client.search_url(&query, search, 1);
        // Items consumed toward the limit, skipped ones included
        let mut seen = 0usize;

        'pages: loop {
            let page_number = report.pages_fetched + 1;
            let what = format!("search page {page_number}");

            let page = match self
                .request(&what, || self.client.search_page(&cursor), on_progress)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    let err = CollectError::from_request(what, e);
                    if err.is_auth() {
                        return Err(err);
                    }
                    tracing::error!(error = %err, "search aborted");
                    report.aborted = Some(err);
                    break;
                }
            };

            report.pages_fetched = page_number;
            report.total_count = Some(page.total_count);
            let count = page.items.len();

            emit(
                on_progress,
                CollectProgress::FetchedPage {
                    page: page_number,
                    count,
                    total_so_far: (seen + count).min(limit),
                    total_count: page.total_count,
                },
            );
            tracing::debug!(
                page = page_number,
                count,
                total_count = page.total_count,
                "fetched search page"
            );

            if page.incomplete_results {
                let message = format!(
                    "GitHub reported incomplete results for page {page_number}; some matches may be missing"
                );
                tracing::warn!("{message}");
                emit(on_progress, CollectProgress::Warning { message });
            }

            for item in &page.items {
                if seen >= limit {
                    break;
                }
                seen += 1;

                match self.collect_item(item, on_progress).await {
                    ItemOutcome::Collected(record) => {
                        emit(
                            on_progress,
                            CollectProgress::RecordCollected {
                                owner: record.owner.clone(),
                                name: record.name.clone(),
                            },
                        );
                        report.records.push(record);
                    }
                    ItemOutcome::Skipped(skipped) => {
                        tracing::warn!(
                            repo = %skipped.label(),
                            reason = %skipped.reason,
                            "skipping repository"
                        );
                        emit(
                            on_progress,
                            CollectProgress::RepoSkipped {
                                repo: skipped.label(),
                                reason: skipped.reason.clone(),
                            },
                        );
                        report.skipped.push(skipped);
                    }
                    ItemOutcome::Fatal(what, e) => {
                        let err = CollectError::from_request(what, e);
                        if err.is_auth() {
                            return Err(err);
                        }
                        tracing::error!(error = %err, "search aborted");
                        report.aborted = Some(err);
                        break 'pages;
                    }
                }
            }

            let exhausted = count == 0
                || seen >= limit
                || seen as u64 >= page.total_count
                || page_number >= max_pages;
            if exhausted {
                break;
            }
            match page.pagination.next {
                Some(next) => cursor = next,
                None => break,
            }
        }

        emit(
            on_progress,
            CollectProgress::CollectComplete {
                records: report.records.len(),
                skipped: report.skipped.len(),
                pages: report.pages_fetched,
            },
        );
        tracing::info!(
            records = report.records.len(),
            skipped = report.skipped.len(),
            pages = report.pages_fetched,
            aborted = report.aborted.is_some(),
            "search finished"
        );

        Ok(report)
    }

    async fn collect_item(
        &self,
        item: &Value,
        on_progress: Option<&ProgressCallback>,
    ) -> ItemOutcome {
        let Some(identity) = item_identity(item) else {
            return ItemOutcome::Skipped(SkippedRepo {
                repo: None,
                reason: "search item has no owner.login or name".to_string(),
            });
        };

        let decoded = match decode_item(item) {
            Ok(decoded) => decoded,
            Err(e) => {
                return ItemOutcome::Skipped(SkippedRepo {
                    repo: Some(identity),
                    reason: format!("malformed search item: {e}"),
                });
            }
        };

        match self.secondary(&identity, on_progress).await {
            Ok((contributors, languages)) => {
                ItemOutcome::Collected(to_record(decoded, contributors, &languages))
            }
            Err((_, e)) if e.is_repo_local() => ItemOutcome::Skipped(SkippedRepo {
                repo: Some(identity),
                reason: short_error_message(&e),
            }),
            Err((what, e)) => ItemOutcome::Fatal(what, e),
        }
    }

    /// Contributor count, then language bytes.
    async fn secondary(
        &self,
        repo: &RepoIdentity,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<(u64, BTreeMap<String, u64>), (String, GitHubError)> {
        let (owner, name) = (repo.owner.as_str(), repo.name.as_str());
        let full_name = repo.full_name();

        let what = format!("contributors of {full_name}");
        let contributors = self
            .request(
                &what,
                || self.client.contributor_count(owner, name),
                on_progress,
            )
            .await
            .map_err(|e| (what, e))?;

        let what = format!("languages of {full_name}");
        let languages = self
            .request(&what, || self.client.languages(owner, name), on_progress)
            .await
            .map_err(|e| (what, e))?;

        Ok((contributors, languages))
    }

    /// Collect a single repository by reference, without searching.
    pub async fn collect_one(
        &self,
        repo: &RepoRef,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<RepositoryRecord, CollectError> {
        tracing::info!(repo = %repo, "collecting single repository");

        let what = format!("repository {repo}");
        let body = self
            .request(
                &what,
                || self.client.get_repository(&repo.owner, &repo.name),
                on_progress,
            )
            .await
            .map_err(|e| CollectError::from_request(what, e))?;

        let decoded = decode_item(&body).map_err(|source| CollectError::Convert {
            repo: repo.to_string(),
            source,
        })?;

        // The canonical casing from the API, not what the user typed
        let identity = RepoIdentity {
            owner: decoded.owner.login.clone(),
            name: decoded.name.clone(),
        };
        let (contributors, languages) = self
            .secondary(&identity, on_progress)
            .await
            .map_err(|(what, e)| CollectError::from_repo_request(what, e))?;

        emit(
            on_progress,
            CollectProgress::RecordCollected {
                owner: identity.owner,
                name: identity.name,
            },
        );

        Ok(to_record(decoded, contributors, &languages))
    }
}
