//! Stargazer CLI - collect GitHub repository search results into JSON or CSV.

mod commands;
mod config;
mod progress;

use std::path::PathBuf;

use clap::Parser;
use console::Term;
use stargazer::{OutputFormat, Range, SortKey, SortOrder};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stargazer")]
#[command(version)]
#[command(about = "Collect GitHub repository search results into JSON or CSV")]
#[command(
    long_about = "Stargazer searches GitHub for repositories matching a set of filters, \
looks up each hit's contributor count and language breakdown, and writes the results \
as a JSON array or a CSV table. Given a repository URL it collects just that repository."
)]
#[command(after_long_help = r#"EXAMPLES
    Popular Python repositories (the default filters):
        $ stargazer

    The 300 most starred Rust repositories, as CSV:
        $ stargazer --language rust --stars '>=1000' --sort stars -l 300 -f csv

    A single repository:
        $ stargazer https://github.com/pallets/flask -o flask.json

CONFIGURATION
    Stargazer reads configuration from:
      1. ~/.config/stargazer/config.toml (or $XDG_CONFIG_HOME/stargazer/config.toml)
      2. ./stargazer.toml
      3. The file given with --config (TOML, JSON or YAML)
      4. Environment variables (STARGAZER_* prefix, e.g., STARGAZER_SEARCH__LIMIT)
      5. .env file in current directory

ENVIRONMENT VARIABLES
    STARGAZER_GITHUB_TOKEN    GitHub personal access token
    GITHUB_TOKEN              Used when no other token is configured
    RUST_LOG                  Log filter when output is not a terminal
"#)]
struct Cli {
    /// Collect a single repository (URL or owner/name) instead of searching
    repo: Option<String>,

    /// Output format (default from --output extension, config, or json)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Output file (default from config or repositories.<format>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Additional config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of repositories to collect (default from config or 100)
    #[arg(short, long)]
    limit: Option<u32>,

    /// Search results per page, at most 100 (default from config or 30)
    #[arg(short, long)]
    per_page: Option<u32>,

    /// Sort search results by stars, forks, help-wanted-issues or updated
    #[arg(long)]
    sort: Option<SortKey>,

    /// Sort direction, asc or desc
    #[arg(long)]
    order: Option<SortOrder>,

    /// Only repositories in this language
    #[arg(long)]
    language: Option<String>,

    /// Star count, e.g. 500, '>=500', '<100' or 10..50
    #[arg(long)]
    stars: Option<Range<u64>>,

    /// Only repositories owned by this user or organization
    #[arg(long)]
    user: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing for non-TTY mode (structured logging)
    // Only initialize if not connected to a TTY
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("stargazer=info,stargazer_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    // Load configuration (config files -> env vars -> defaults)
    let config = config::Config::load(cli.config.as_deref())?;

    commands::collect::handle_collect(cli, &config).await
}
