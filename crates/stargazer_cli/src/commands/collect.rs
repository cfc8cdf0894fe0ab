use std::path::PathBuf;
use std::sync::Arc;

use console::Term;
use stargazer::output::write_records;
use stargazer::{
    ApiRateLimiter, CollectOptions, Collector, FilterCriteria, GitHubClient, OutputFormat,
    RepoRef, SearchOptions,
};

use crate::Cli;
use crate::config::Config;
use crate::progress::{ProgressReporter, Summary};

pub(crate) async fn handle_collect(
    cli: Cli,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = config.github_token();
    if token.is_none() {
        tracing::warn!(
            "No GitHub token configured; set STARGAZER_GITHUB_TOKEN or GITHUB_TOKEN for higher rate limits"
        );
    }

    let mut client = GitHubClient::new(&config.github.api_url, token.as_deref(), config.timeout())?;
    if let Some(rps) = config.github.requests_per_second.filter(|rps| *rps > 0) {
        client = client.with_pacer(ApiRateLimiter::new(rps));
    }

    display_rate_limit(&client).await;

    run(&client, cli, config).await
}

/// Collect with `client` and write the output file.
///
/// Credential and filter errors return before anything is written. A run
/// that stopped early writes what it gathered, then returns the error.
pub(crate) async fn run(
    client: &GitHubClient,
    cli: Cli,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = output_format(&cli, config);
    let path = output_path(&cli, config, format);

    let options = CollectOptions::default()
        .with_search(search_options(&cli, config))
        .with_retry(config.retry_config())
        .with_rate_limit(config.rate_limit_policy());

    let reporter = Arc::new(ProgressReporter::new());
    let on_progress = reporter.as_callback();
    let collector = Collector::new(client, options);

    match cli.repo.as_deref() {
        Some(input) => {
            let repo = RepoRef::parse(input)?;
            let result = collector.collect_one(&repo, Some(&on_progress)).await;
            reporter.finish();

            let records = vec![result?];
            write_records(&path, format, &records)?;
            reporter.summary(Summary {
                records: records.len(),
                skipped: 0,
                path: &path,
                partial: false,
            });
        }
        None => {
            let filters = search_filters(&cli, config);
            let result = collector.collect(&filters, Some(&on_progress)).await;
            reporter.finish();

            let mut report = result?;
            write_records(&path, format, &report.records)?;
            reporter.summary(Summary {
                records: report.records.len(),
                skipped: report.skipped.len(),
                path: &path,
                partial: report.aborted.is_some(),
            });

            if let Some(err) = report.aborted.take() {
                return Err(err.into());
            }
        }
    }

    Ok(())
}

/// `--format`, else the `--output` extension, else config.
fn output_format(cli: &Cli, config: &Config) -> OutputFormat {
    cli.format
        .or_else(|| cli.output.as_deref().and_then(OutputFormat::from_path))
        .unwrap_or(config.output.format)
}

fn output_path(cli: &Cli, config: &Config, format: OutputFormat) -> PathBuf {
    cli.output
        .clone()
        .unwrap_or_else(|| config.output_path(format))
}

/// Config search settings with CLI flags on top.
fn search_options(cli: &Cli, config: &Config) -> SearchOptions {
    let mut options = config.search_options();
    if let Some(sort) = cli.sort {
        options.sort = Some(sort);
    }
    if let Some(order) = cli.order {
        options.order = order;
    }
    if let Some(per_page) = cli.per_page {
        options.per_page = per_page;
    }
    if let Some(limit) = cli.limit {
        options.limit = limit;
    }
    options
}

/// Config filters, overridden key by key by CLI flags.
fn search_filters(cli: &Cli, config: &Config) -> FilterCriteria {
    config.filters().overlay(FilterCriteria {
        language: cli.language.clone(),
        stars: cli.stars,
        user: cli.user.clone(),
        ..Default::default()
    })
}

/// Show the remaining quota. Failure here is not fatal; the run reports
/// credential problems itself.
async fn display_rate_limit(client: &GitHubClient) {
    let is_tty = Term::stdout().is_term();
    match client.rate_limit().await {
        Ok(status) => {
            if is_tty {
                println!(
                    "Search rate limit: {}/{} remaining (resets at {})\n",
                    status.search.remaining, status.search.limit, status.search.reset_at
                );
            } else {
                tracing::info!(
                    search_remaining = status.search.remaining,
                    search_limit = status.search.limit,
                    core_remaining = status.core.remaining,
                    core_limit = status.core.limit,
                    "Rate limit status"
                );
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "Could not fetch rate limit status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use clap::Parser;
    use serde_json::json;
    use stargazer::output::read_json;
    use stargazer::{HttpError, HttpRequest, HttpResponse, HttpTransport, Range, SortKey, SortOrder};

    const BASE: &str = "https://api.fake";

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stargazer").chain(args.iter().copied())).unwrap()
    }

    /// Answers by exact URL, oldest scripted response first.
    #[derive(Default)]
    struct ScriptedGitHub {
        routes: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    }

    impl ScriptedGitHub {
        fn respond(
            &self,
            url: impl Into<String>,
            status: u16,
            headers: &[(&str, &str)],
            body: &str,
        ) {
            let response = HttpResponse {
                status,
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.as_bytes().to_vec(),
            };
            self.routes
                .lock()
                .unwrap()
                .entry(url.into())
                .or_default()
                .push_back(response);
        }

        fn page(&self, url: &str, total: u64, owner: &str, name: &str, next: Option<&str>) {
            let body = json!({
                "total_count": total,
                "incomplete_results": false,
                "items": [{
                    "name": name,
                    "owner": {"login": owner},
                    "html_url": format!("https://github.com/{owner}/{name}"),
                    "description": "",
                    "stargazers_count": 900,
                    "watchers_count": 900,
                    "forks_count": 90,
                    "open_issues_count": 1,
                    "default_branch": "main",
                    "pushed_at": "2024-06-01T08:00:00Z"
                }],
            })
            .to_string();
            let link = next.map(|n| format!("<{n}>; rel=\"next\""));
            let headers: Vec<(&str, &str)> =
                link.as_deref().map(|l| vec![("Link", l)]).unwrap_or_default();
            self.respond(url, 200, &headers, &body);
        }

        fn repo(&self, owner: &str, name: &str) {
            self.respond(
                format!("{BASE}/repos/{owner}/{name}/contributors?per_page=1&anon=true"),
                200,
                &[],
                r#"[{"login":"someone"}]"#,
            );
            self.respond(
                format!("{BASE}/repos/{owner}/{name}/languages"),
                200,
                &[],
                r#"{"Python": 10}"#,
            );
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedGitHub {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            self.routes
                .lock()
                .unwrap()
                .get_mut(&request.url)
                .and_then(VecDeque::pop_front)
                .ok_or(HttpError::NoMockResponse { url: request.url })
        }
    }

    fn fast_retry_config() -> Config {
        let mut config = Config::default();
        config.retry.max_retries = 1;
        config.retry.min_delay_ms = 10;
        config.retry.max_delay_ms = 10;
        config
    }

    fn scripted_client(github: Arc<ScriptedGitHub>) -> GitHubClient {
        GitHubClient::new_with_transport(BASE, Some("token"), github)
    }

    fn page_url(client: &GitHubClient, cli: &Cli, config: &Config, page: u32) -> String {
        let query = search_filters(cli, config).to_query().unwrap();
        client.search_url(&query, &search_options(cli, config), page)
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_search_writes_partial_output_then_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("repos.json");
        let args = ["-p", "1", "-o", out.to_str().unwrap()];
        let config = fast_retry_config();

        let github = Arc::new(ScriptedGitHub::default());
        let client = scripted_client(Arc::clone(&github));
        let (p1, p2) = (
            page_url(&client, &cli(&args), &config, 1),
            page_url(&client, &cli(&args), &config, 2),
        );
        github.page(&p1, 5, "pallets", "flask", Some(p2.as_str()));
        github.repo("pallets", "flask");
        for _ in 0..2 {
            github.respond(&p2, 502, &[], "Bad Gateway");
        }

        let err = run(&client, cli(&args), &config).await.unwrap_err();
        assert!(err.to_string().contains("search page 2"), "{err}");

        let written = read_json(std::fs::File::open(&out).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].full_name(), "pallets/flask");
    }

    #[tokio::test]
    async fn test_rejected_credentials_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("repos.csv");
        let args = ["-o", out.to_str().unwrap()];
        let config = fast_retry_config();

        let github = Arc::new(ScriptedGitHub::default());
        let client = scripted_client(Arc::clone(&github));
        github.respond(
            page_url(&client, &cli(&args), &config, 1),
            401,
            &[],
            r#"{"message": "Bad credentials"}"#,
        );

        let err = run(&client, cli(&args), &config).await.unwrap_err();
        assert!(err.to_string().contains("rejected the credentials"), "{err}");
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_single_repository_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("flask.json");
        let args = ["https://github.com/pallets/flask", "-o", out.to_str().unwrap()];

        let github = Arc::new(ScriptedGitHub::default());
        let client = scripted_client(Arc::clone(&github));
        github.respond(
            format!("{BASE}/repos/pallets/flask"),
            200,
            &[],
            &json!({
                "name": "flask",
                "owner": {"login": "pallets"},
                "html_url": "https://github.com/pallets/flask",
                "description": "web framework",
                "stargazers_count": 70000,
                "watchers_count": 70000,
                "forks_count": 16000,
                "open_issues_count": 5,
                "default_branch": "main",
                "pushed_at": "2024-06-01T08:00:00Z"
            })
            .to_string(),
        );
        github.repo("pallets", "flask");

        run(&client, cli(&args), &Config::default()).await.unwrap();

        let written = read_json(std::fs::File::open(&out).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].languages.get("Python"), Some(&100.0));
    }

    #[test]
    fn test_no_flags_uses_config() {
        let config = Config::default();
        let cli = cli(&[]);

        assert!(cli.repo.is_none());
        assert_eq!(
            search_filters(&cli, &config).to_query().unwrap(),
            "language:python stars:>=500"
        );
        assert_eq!(search_options(&cli, &config), config.search_options());
        assert_eq!(output_format(&cli, &config), OutputFormat::Json);
        assert_eq!(
            output_path(&cli, &config, OutputFormat::Json),
            PathBuf::from("repositories.json")
        );
    }

    #[test]
    fn test_filter_flags_override_key_by_key() {
        let config = Config::default();
        let cli = cli(&["--language", "rust", "--user", "tokio-rs"]);

        let filters = search_filters(&cli, &config);
        assert_eq!(filters.language.as_deref(), Some("rust"));
        // Not given on the command line, so the config default stays
        assert_eq!(filters.stars, Some(Range::AtLeast(500)));
        assert_eq!(filters.user.as_deref(), Some("tokio-rs"));
    }

    #[test]
    fn test_stars_flag_parses_ranges() {
        let cli = cli(&["--stars", "10..50"]);
        assert_eq!(cli.stars, Some(Range::Between(10, 50)));

        assert!(Cli::try_parse_from(["stargazer", "--stars", "50..10"]).is_err());
    }

    #[test]
    fn test_search_flags_override_config() {
        let config = Config::default();
        let cli = cli(&[
            "-l", "250", "-p", "100", "--sort", "forks", "--order", "asc",
        ]);

        let options = search_options(&cli, &config);
        assert_eq!(options.limit, 250);
        assert_eq!(options.per_page, 100);
        assert_eq!(options.sort, Some(SortKey::Forks));
        assert_eq!(options.order, SortOrder::Asc);
    }

    #[test]
    fn test_output_format_from_extension() {
        let config = Config::default();

        let cli_csv = cli(&["-o", "out/repos.csv"]);
        assert_eq!(output_format(&cli_csv, &config), OutputFormat::Csv);
        assert_eq!(
            output_path(&cli_csv, &config, OutputFormat::Csv),
            PathBuf::from("out/repos.csv")
        );

        // An explicit format wins over the extension
        let explicit = cli(&["-f", "json", "-o", "repos.csv"]);
        assert_eq!(output_format(&explicit, &config), OutputFormat::Json);
    }

    #[test]
    fn test_repo_argument() {
        let cli = cli(&["https://github.com/pallets/flask", "-f", "csv"]);
        assert_eq!(cli.repo.as_deref(), Some("https://github.com/pallets/flask"));
        assert_eq!(cli.format, Some(OutputFormat::Csv));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["stargazer", "-f", "xml"]).is_err());
    }
}
