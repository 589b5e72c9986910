use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::api::RepositoryCandidate;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::metrics::average_response_hours;
use crate::store::{RepositoryRecord, Store};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Recorded,
    AlreadyCollected,
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Candidates that passed the filters, whatever became of them.
    pub processed: usize,
    pub recorded: usize,
    pub already_collected: usize,
    pub failed: usize,
    pub filtered_out: usize,
    pub pages: usize,
}

impl RunSummary {
    fn count(&mut self, outcome: Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Recorded => self.recorded += 1,
            Outcome::AlreadyCollected => self.already_collected += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

pub struct Collector<'a, T: Transport + ?Sized, C: Clock + ?Sized> {
    config: Config,
    fetcher: Fetcher<'a, T, C>,
    clock: &'a C,
    store: Store,
    window_start: DateTime<Utc>,
}

impl<'a, T: Transport + ?Sized, C: Clock + ?Sized> Collector<'a, T, C> {
    pub fn new(config: Config, transport: &'a T, clock: &'a C, store: Store) -> Self {
        let fetcher = Fetcher::new(transport, clock, &config);
        let now = clock.now();
        let window_start = chrono::TimeDelta::try_days(config.window_days)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            config,
            fetcher,
            clock,
            store,
            window_start,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn run(&mut self, max_repositories: usize, queries: &[String]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for query in queries {
            let mut page = 1u32;
            while summary.processed < max_repositories {
                info!("searching with query: {query}, page: {page}");
                let candidates = self.fetcher.search(query, page, self.config.per_page);
                summary.pages += 1;
                if candidates.is_empty() {
                    info!("no more repositories found for query: {query}");
                    break;
                }
                for candidate in &candidates {
                    if summary.processed >= max_repositories {
                        break;
                    }
                    if !self.matches(candidate) {
                        info!("skipping {}", candidate.full_name);
                        summary.filtered_out += 1;
                        continue;
                    }
                    let outcome = self.process(candidate);
                    summary.count(outcome);
                    info!("processed {}/{max_repositories} repositories", summary.processed);
                }
                page += 1;
                self.clock.sleep(self.config.page_pause.sample());
            }
        }
        info!(
            "completed processing {} repositories ({} recorded, {} already collected, {} failed)",
            summary.processed, summary.recorded, summary.already_collected, summary.failed
        );
        self.store.save()?;
        Ok(summary)
    }

    pub fn matches(&self, candidate: &RepositoryCandidate) -> bool {
        candidate.language.as_deref() == Some(self.config.target_language.as_str())
            && self.config.stars_in_range(candidate.stargazers_count)
    }

    /// Fetches, derives and stores one repository.
    pub fn process(&mut self, candidate: &RepositoryCandidate) -> Outcome {
        let name = &candidate.full_name;
        info!("processing repository: {name}");
        if self.store.contains(name) {
            info!("already processed {name}, skipping");
            return Outcome::AlreadyCollected;
        }
        let outcome = match self
            .collect(candidate)
            .and_then(|record| self.store.record(record))
        {
            Ok(_) => Outcome::Recorded,
            Err(e) => {
                error!("error processing repository {name}: {e}");
                Outcome::Failed
            }
        };
        self.clock.sleep(self.config.repo_pause.sample());
        outcome
    }

    fn collect(&self, candidate: &RepositoryCandidate) -> Result<RepositoryRecord> {
        let name = &candidate.full_name;
        let pulls = self.fetcher.pull_requests(name, self.window_start)?;
        let issues = self.fetcher.issues(name, self.window_start)?;
        let commits = self.fetcher.commits(name, self.window_start)?;
        let pr_hours = average_response_hours(&pulls, |url| self.fetcher.comments(url))?;
        let issue_hours = average_response_hours(&issues, |url| self.fetcher.comments(url))?;
        Ok(RepositoryRecord {
            repo_name: name.clone(),
            language: candidate.language.clone(),
            stars: candidate.stargazers_count,
            forks: candidate.forks_count,
            pull_requests_last_7d: pulls.len(),
            issues_last_7d: issues.len(),
            commits_last_7d: commits.len(),
            avg_pr_response_time_hours: pr_hours,
            avg_issue_response_time_hours: issue_hours,
            collected_at: self.clock.now(),
        })
    }
}
