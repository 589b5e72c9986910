use std::time::Duration;

use anyhow::Context;
use repo_pulse::clock::SystemClock;
use repo_pulse::collector::Collector;
use repo_pulse::config::Config;
use repo_pulse::store::Store;
use repo_pulse::transport::HttpTransport;
use repo_pulse::{cli, logging};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = cli::parse();
    logging::init(cli.log_file.as_deref()).context("failed to open log file")?;

    let mut config = Config::discover(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;
    let token = cli.token()?;

    let transport = HttpTransport::new(
        Some(token),
        &config.user_agent,
        config.request_timeout_secs.map(Duration::from_secs),
    )?;
    let clock = SystemClock;
    let store = Store::load(&config.output_file)
        .with_context(|| format!("failed to load {}", config.output_file.display()))?;

    let max_repositories = config.max_repositories;
    let queries = config.queries.clone();
    let mut collector = Collector::new(config, &transport, &clock, store);
    let summary = collector.run(max_repositories, &queries)?;
    info!(
        "{} repositories stored in {} ({} new this run, {} failed)",
        collector.store().len(),
        collector.store().path().display(),
        summary.recorded,
        summary.failed
    );
    Ok(())
}
