use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("no GitHub token found, set it with GITHUB_TOKEN=your_token_here (or --token)")]
    MissingToken,
    #[error("failed to read config {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("store io error at {path}: {source}")]
    StoreIo { path: PathBuf, source: io::Error },
    #[error("failed to encode store: {0}")]
    StoreEncode(serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response shape from {url}: {source}")]
    Decode { url: String, source: serde_json::Error },
}

pub type Result<T, E = CollectError> = std::result::Result<T, E>;
