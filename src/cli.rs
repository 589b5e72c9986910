use std::env;
use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::error::{CollectError, Result};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Collect recent pull request, issue and commit activity for GitHub repositories",
    long_about = "Searches GitHub for repositories matching a language and star range, \
                  records their activity over the last week and stores the results in a \
                  JSON file. Repositories already in the file are skipped, so runs can be resumed."
)]
pub struct Cli {
    #[arg(
        long,
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        value_name = "TOKEN",
        help = "GitHub API token"
    )]
    pub token: Option<String>,

    #[arg(
        short = 'c',
        long,
        env = "COLLECTOR_CONFIG",
        value_name = "PATH",
        help = "TOML config file (defaults to ./collector.toml when present)"
    )]
    pub config: Option<PathBuf>,

    #[arg(short = 'o', long, value_name = "PATH", help = "Where to store the collected metrics")]
    pub output: Option<PathBuf>,

    #[arg(short = 'n', long = "max-repos", value_name = "N", help = "Stop after processing N repositories")]
    pub max_repos: Option<usize>,

    #[arg(
        short = 'q',
        long = "query",
        value_name = "QUERY",
        help = "Search query, may be repeated (replaces the configured queries)"
    )]
    pub queries: Vec<String>,

    #[arg(
        long = "log-file",
        env = "COLLECTOR_LOG_FILE",
        value_name = "PATH",
        help = "Write logs to PATH (in addition to stderr)"
    )]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output_file = output.clone();
        }
        if let Some(max) = self.max_repos {
            config.max_repositories = max;
        }
        if !self.queries.is_empty() {
            config.queries = self.queries.clone();
        }
    }

    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(CollectError::MissingToken)
    }
}

/// Loads `.env` (or `$DOTENV_PATH`) before parsing so it can supply `GITHUB_TOKEN`.
pub fn parse() -> Cli {
    let dotenv_path = env::var("DOTENV_PATH").unwrap_or_else(|_| ".env".into());
    dotenvy::from_filename(&dotenv_path).ok();
    Cli::parse()
}
