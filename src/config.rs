use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CollectError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "collector.toml";
pub const MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Deserialize, Serialize, PartialEq, Eq, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api_base_url: String,
    pub user_agent: String,
    pub output_file: PathBuf,
    pub target_language: String,
    pub min_stars: u64,
    pub max_stars: u64,
    pub max_repositories: usize,
    pub queries: Vec<String>,
    pub per_page: u32,
    pub window_days: i64,
    pub error_backoff_secs: u64,
    pub rate_limit_margin_secs: u64,
    /// `None` keeps waiting on rate limits for as long as the server asks.
    pub max_rate_limit_waits: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub repo_pause: PauseRange,
    pub page_pause: PauseRange,
}

/// Bounds of a uniformly random politeness delay, in milliseconds.
#[derive(Deserialize, Serialize, PartialEq, Eq, Debug, Clone, Copy)]
pub struct PauseRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl PauseRange {
    pub const NONE: PauseRange = PauseRange { min_ms: 0, max_ms: 0 };

    pub fn sample(&self) -> Duration {
        use rand::Rng;

        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            user_agent: "GitHub-Metrics-Collector".to_string(),
            output_file: PathBuf::from("github_metrics.json"),
            target_language: "Python".to_string(),
            min_stars: 150,
            max_stars: 300,
            max_repositories: 5000,
            queries: vec!["language:python stars:150..300 sort:updated".to_string()],
            per_page: 30,
            window_days: 7,
            error_backoff_secs: 5,
            rate_limit_margin_secs: 5,
            max_rate_limit_waits: None,
            request_timeout_secs: None,
            repo_pause: PauseRange { min_ms: 1000, max_ms: 3000 },
            page_pause: PauseRange { min_ms: 2000, max_ms: 5000 },
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path).map_err(|source| CollectError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str::<Config>(&contents)?)
    }

    /// Loads `path` if given, otherwise `collector.toml` when present, otherwise the defaults.
    pub fn discover(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Config::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Config::load(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Config::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_stars > self.max_stars {
            return Err(invalid(format!(
                "min_stars ({}) is greater than max_stars ({})",
                self.min_stars, self.max_stars
            )));
        }
        if !(1..=100).contains(&self.per_page) {
            return Err(invalid(format!(
                "per_page must be within 1..=100, got {}",
                self.per_page
            )));
        }
        if self.queries.is_empty() {
            return Err(invalid("at least one search query is required".to_string()));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(invalid(format!(
                "window_days must be within 1..={MAX_WINDOW_DAYS}, got {}",
                self.window_days
            )));
        }
        for (name, range) in [("repo_pause", self.repo_pause), ("page_pause", self.page_pause)] {
            if range.min_ms > range.max_ms {
                return Err(invalid(format!("{name}.min_ms is greater than {name}.max_ms")));
            }
        }
        Ok(())
    }

    pub fn stars_in_range(&self, stars: u64) -> bool {
        (self.min_stars..=self.max_stars).contains(&stars)
    }
}

fn invalid(message: String) -> CollectError {
    CollectError::InvalidConfig(message)
}
