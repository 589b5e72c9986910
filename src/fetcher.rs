use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{Comment, Issue, PullRequest, RepositoryCandidate, SearchPage};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{CollectError, Result};
use crate::transport::{ApiResponse, Transport};

pub struct Fetcher<'a, T: Transport + ?Sized, C: Clock + ?Sized> {
    transport: &'a T,
    clock: &'a C,
    base_url: String,
    error_backoff: Duration,
    rate_limit_margin: Duration,
    max_rate_limit_waits: Option<u32>,
}

impl<'a, T: Transport + ?Sized, C: Clock + ?Sized> Fetcher<'a, T, C> {
    pub fn new(transport: &'a T, clock: &'a C, config: &Config) -> Self {
        Self {
            transport,
            clock,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
            rate_limit_margin: Duration::from_secs(config.rate_limit_margin_secs),
            max_rate_limit_waits: config.max_rate_limit_waits,
        }
    }

    /// GETs `url`, waiting out exhausted rate limits. Any other failure is
    /// logged, followed by a fixed back-off, and reported as `None`.
    pub fn request(&self, url: &str, params: &[(&str, String)]) -> Option<Value> {
        let mut waits = 0u32;
        loop {
            let resp = match self.transport.get(url, params) {
                Ok(resp) => resp,
                Err(e) => return self.give_up(url, &e.to_string()),
            };
            if resp.is_rate_limited() {
                if self.max_rate_limit_waits.is_some_and(|max| waits >= max) {
                    return self.give_up(url, "rate limit still exhausted after maximum waits");
                }
                waits += 1;
                let wait = self.rate_limit_wait(&resp);
                warn!("rate limit exceeded, sleeping for {}s", wait.as_secs());
                self.clock.sleep(wait);
                continue;
            }
            if !resp.is_success() {
                return self.give_up(url, &format!("HTTP status {}", resp.status));
            }
            return match resp.body {
                Some(body) => Some(body),
                None => self.give_up(url, "missing response body"),
            };
        }
    }

    fn give_up(&self, url: &str, reason: &str) -> Option<Value> {
        warn!("error making request to {url}: {reason}");
        self.clock.sleep(self.error_backoff);
        None
    }

    /// Seconds until the advertised reset plus the safety margin, never under one second.
    fn rate_limit_wait(&self, resp: &ApiResponse) -> Duration {
        let now = self.clock.now();
        let reset_at = resp.rate_limit.reset_at.unwrap_or(now);
        let until_reset = (reset_at - now).num_milliseconds() as f64 / 1000.0;
        let wait = until_reset + self.rate_limit_margin.as_secs_f64();
        Duration::from_secs_f64(wait.max(1.0))
    }

    pub fn search(&self, query: &str, page: u32, per_page: u32) -> Vec<RepositoryCandidate> {
        let url = format!("{}/search/repositories", self.base_url);
        let params = [
            ("q", query.to_string()),
            ("sort", "updated".to_string()),
            ("order", "desc".to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        let Some(body) = self.request(&url, &params) else {
            return vec![];
        };
        match serde_json::from_value::<SearchPage>(body) {
            Ok(page) => page.items,
            Err(e) => {
                warn!("unexpected search response for {query:?}: {e}");
                vec![]
            }
        }
    }

    /// Reads one page of pull requests, newest update first, and keeps
    /// everything up to the first one last updated before `cutoff`.
    pub fn pull_requests(&self, full_name: &str, cutoff: DateTime<Utc>) -> Result<Vec<PullRequest>> {
        let url = format!("{}/repos/{full_name}/pulls", self.base_url);
        let params = [
            ("state", "all".to_string()),
            ("sort", "updated".to_string()),
            ("direction", "desc".to_string()),
            ("per_page", "100".to_string()),
        ];
        let pulls: Vec<PullRequest> = self.fetch_list(&url, &params)?;
        Ok(pulls
            .into_iter()
            .take_while(|pr| pr.updated_at >= cutoff)
            .collect())
    }

    pub fn issues(&self, full_name: &str, since: DateTime<Utc>) -> Result<Vec<Issue>> {
        let url = format!("{}/repos/{full_name}/issues", self.base_url);
        let params = [
            ("state", "all".to_string()),
            ("sort", "updated".to_string()),
            ("direction", "desc".to_string()),
            ("per_page", "100".to_string()),
            ("since", iso8601(since)),
        ];
        let issues: Vec<Issue> = self.fetch_list(&url, &params)?;
        Ok(issues.into_iter().filter(|i| !i.is_pull_request()).collect())
    }

    pub fn commits(&self, full_name: &str, since: DateTime<Utc>) -> Result<Vec<Value>> {
        let url = format!("{}/repos/{full_name}/commits", self.base_url);
        let params = [("since", iso8601(since)), ("per_page", "100".to_string())];
        self.fetch_list(&url, &params)
    }

    pub fn comments(&self, comments_url: &str) -> Result<Vec<Comment>> {
        self.fetch_list(comments_url, &[])
    }

    fn fetch_list<D: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Result<Vec<D>> {
        let Some(body) = self.request(url, params) else {
            return Ok(vec![]);
        };
        let items = serde_json::from_value::<Vec<D>>(body).map_err(|source| CollectError::Decode {
            url: url.to_string(),
            source,
        })?;
        debug!("{url}: {} items", items.len());
        Ok(items)
    }
}

fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
