//! JSON-array file store.
//!
//! The whole file is rewritten on every persist. That keeps the on-disk
//! format a plain pretty-printed array that other tools can read, at the
//! cost of O(n) writes per update; fine for a few thousand records and a
//! single running instance.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::pipeline::types::ClassifiedRecord;
use crate::store::traits::RecordStore;

/// Record store backed by a pretty-printed JSON array on disk.
pub struct JsonFileStore {
    path: PathBuf,
    records: Vec<ClassifiedRecord>,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match fs::read_to_string(&path).await {
            Ok(content) => parse_records(&path, &content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Cache file absent, starting empty");
                Vec::new()
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        info!(path = %path.display(), count = records.len(), "Opened record store");
        Ok(Self { path, records })
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    fn exists(&self, record: &ClassifiedRecord) -> bool {
        self.records.iter().any(|r| r == record)
    }

    fn upsert(&mut self, record: ClassifiedRecord) -> bool {
        if self.exists(&record) {
            return false;
        }
        self.records.push(record);
        true
    }

    fn records(&self) -> &[ClassifiedRecord] {
        &self.records
    }

    async fn persist(&self) -> Result<(), StoreError> {
        write_records(&self.path, &self.records).await
    }
}

/// Read a JSON array of records that must exist.
pub async fn read_records(path: &Path) -> Result<Vec<ClassifiedRecord>, StoreError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_records(path, &content)
}

/// Overwrite `path` with `records` as a pretty-printed JSON array.
pub async fn write_records(path: &Path, records: &[ClassifiedRecord]) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(records).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
    }
    fs::write(path, json)
        .await
        .map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_records(path: &Path, content: &str) -> Result<Vec<ClassifiedRecord>, StoreError> {
    serde_json::from_str(content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}
