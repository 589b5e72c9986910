use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Logs to stderr, and also appends to `log_file` when one is given.
/// `RUST_LOG` overrides the default `info` level.
pub fn init(log_file: Option<&Path>) -> io::Result<()> {
    // the subscriber is built without its own `log` bridge
    let _ = tracing_log::LogTracer::init();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = builder
                .with_ansi(false)
                .with_writer(io::stderr.and(Arc::new(file)))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(io::stderr).try_init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_subscriber_and_log_bridge() {
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("logs").join("collector.log");
        init(Some(&log_file)).unwrap();

        tracing::warn!("collector log marker");
        let contents = fs::read_to_string(&log_file).unwrap();
        assert!(contents.contains("collector log marker"));
        // the bridge is already in place, a second install is refused
        assert!(tracing_log::LogTracer::init().is_err());
    }
}
