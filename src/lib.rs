//! Collects recent pull request, issue and commit activity for GitHub
//! repositories into a resumable JSON store.

pub mod api;
pub mod cli;
pub mod clock;
pub mod collector;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod metrics;
pub mod store;
pub mod transport;
