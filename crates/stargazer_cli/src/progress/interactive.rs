use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use stargazer::collect::CollectProgress;

use super::Summary;

#[derive(Default)]
struct ProgressState {
    /// Search bar, or a spinner for single-repository runs.
    bar: Option<ProgressBar>,
    /// Effective limit announced by `SearchStarted`.
    limit: u64,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            state: Mutex::new(ProgressState::default()),
        }
    }

    #[cfg(test)]
    fn hidden() -> Self {
        use indicatif::ProgressDrawTarget;
        Self::with_multi(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()))
    }

    /// The current bar, or a spinner when nothing announced a search.
    fn bar<'s>(&self, state: &'s mut ProgressState) -> &'s ProgressBar {
        state.bar.get_or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new_spinner());
            bar.set_style(Self::spinner_style());
            bar.set_prefix(format!("{:10}", "repo"));
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        })
    }

    pub fn handle(&self, event: CollectProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            CollectProgress::SearchStarted { query, limit, .. } => {
                let bar = self.multi.add(ProgressBar::new(u64::from(limit)));
                bar.set_style(Self::bar_style());
                bar.set_prefix(format!("{:10}", "search"));
                bar.set_message(query);
                state.limit = u64::from(limit);
                state.bar = Some(bar);
            }

            CollectProgress::FetchedPage {
                page, total_count, ..
            } => {
                // Fewer matches than the limit shortens the bar
                let length = state.limit.min(total_count);
                let bar = self.bar(&mut state);
                if length > 0 {
                    bar.set_length(length);
                }
                bar.set_message(format!("page {} of {} matches", page, total_count));
            }

            CollectProgress::RecordCollected { owner, name } => {
                let bar = self.bar(&mut state);
                bar.inc(1);
                bar.set_message(format!("{}/{}", owner, name));
            }

            CollectProgress::RepoSkipped { repo, reason } => {
                self.bar(&mut state).inc(1);
                drop(state);
                self.multi
                    .println(format!("⚠ skipped {}: {}", repo, reason))
                    .ok();
            }

            CollectProgress::RateLimited {
                what,
                wait_ms,
                attempt,
                ..
            } => {
                self.bar(&mut state).set_message(format!(
                    "⏳ {} rate limited, retry {} in {:.1}s",
                    what,
                    attempt,
                    wait_ms as f64 / 1000.0
                ));
            }

            CollectProgress::Retrying {
                what,
                attempt,
                retry_after_ms,
                error,
            } => {
                self.bar(&mut state).set_message(format!(
                    "↻ {} failed ({}), retry {} in {:.1}s",
                    what,
                    error,
                    attempt,
                    retry_after_ms as f64 / 1000.0
                ));
            }

            CollectProgress::Warning { message } => {
                // Release lock before printing to avoid holding it during I/O
                drop(state);
                self.multi.println(format!("⚠ {}", message)).ok();
            }

            CollectProgress::CollectComplete {
                records,
                skipped,
                pages,
            } => {
                let msg = if skipped > 0 {
                    format!("✓ {} repos from {} pages, {} skipped", records, pages, skipped)
                } else {
                    format!("✓ {} repos from {} pages", records, pages)
                };
                self.bar(&mut state).finish_with_message(msg);
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref bar) = state.bar
            && !bar.is_finished()
        {
            bar.finish();
        }
    }

    pub fn summary(&self, summary: Summary<'_>) {
        let skipped = if summary.skipped > 0 {
            format!(" ({} skipped)", summary.skipped)
        } else {
            String::new()
        };
        if summary.partial {
            eprintln!(
                "⚠ Wrote partial results: {} repositories to {}{}",
                summary.records,
                summary.path.display(),
                skipped
            );
        } else {
            eprintln!(
                "✓ Wrote {} repositories to {}{}",
                summary.records,
                summary.path.display(),
                skipped
            );
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
