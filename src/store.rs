use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{CollectError, Result};

#[derive(Deserialize, Serialize, PartialEq, Debug, Clone)]
pub struct RepositoryRecord {
    pub repo_name: String,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub pull_requests_last_7d: usize,
    pub issues_last_7d: usize,
    pub commits_last_7d: usize,
    pub avg_pr_response_time_hours: Option<f64>,
    pub avg_issue_response_time_hours: Option<f64>,
    pub collected_at: DateTime<Utc>,
}

/// Repository full name to record, mirrored to a JSON file. Entries are only ever added.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    records: BTreeMap<String, RepositoryRecord>,
}

impl Store {
    /// A missing or unparsable file starts an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Store> {
        let path = path.into();
        let records = match fs::read(&path) {
            Ok(contents) => match serde_json::from_slice::<BTreeMap<String, RepositoryRecord>>(&contents) {
                Ok(records) => {
                    info!("loaded {} existing repository records", records.len());
                    records
                }
                Err(e) => {
                    warn!("error loading existing data from {}: {e}, starting with empty dataset", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(CollectError::StoreIo { path, source }),
        };
        Ok(Store { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.records.contains_key(full_name)
    }

    pub fn get(&self, full_name: &str) -> Option<&RepositoryRecord> {
        self.records.get(full_name)
    }

    /// Adds `record` and writes the store out. Returns `Ok(false)` without
    /// touching anything when the key already exists; a failed write leaves
    /// the store as it was.
    pub fn record(&mut self, record: RepositoryRecord) -> Result<bool> {
        if self.records.contains_key(&record.repo_name) {
            return Ok(false);
        }
        let key = record.repo_name.clone();
        self.records.insert(key.clone(), record);
        if let Err(e) = self.save() {
            self.records.remove(&key);
            return Err(e);
        }
        Ok(true)
    }

    /// Rewrites the whole file via a temporary sibling and an atomic rename.
    pub fn save(&self) -> Result<()> {
        let io_err = |source: io::Error| CollectError::StoreIo {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.records.serialize(&mut ser).map_err(CollectError::StoreEncode)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&buf).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}
