//! Classification cache — the safe and unsafe stores for one run.

use tracing::debug;

use crate::config::DataPaths;
use crate::error::StoreError;
use crate::pipeline::types::{ClassifiedRecord, Label};
use crate::store::json_file::JsonFileStore;
use crate::store::traits::RecordStore;

/// Owns both label stores and keeps a record in at most one of them.
pub struct ClassificationCache {
    safe: Box<dyn RecordStore>,
    unsafe_records: Box<dyn RecordStore>,
}

impl ClassificationCache {
    pub fn new(safe: Box<dyn RecordStore>, unsafe_records: Box<dyn RecordStore>) -> Self {
        Self {
            safe,
            unsafe_records,
        }
    }

    /// Open the JSON caches named by `paths`; missing files start empty.
    pub async fn open(paths: &DataPaths) -> Result<Self, StoreError> {
        let safe = JsonFileStore::open(paths.safe_cache()).await?;
        let unsafe_records = JsonFileStore::open(paths.unsafe_cache()).await?;
        Ok(Self::new(Box::new(safe), Box::new(unsafe_records)))
    }

    /// Whether `record` has already been classified either way.
    pub fn contains(&self, record: &ClassifiedRecord) -> bool {
        self.safe.exists(record) || self.unsafe_records.exists(record)
    }

    /// Store `record` under `label` and rewrite both stores.
    ///
    /// Returns `false` without touching disk when the record is already in
    /// either store, so two workers racing on the same transaction cannot
    /// put it in both.
    pub async fn record(&mut self, record: ClassifiedRecord, label: Label) -> Result<bool, StoreError> {
        if self.contains(&record) {
            debug!(memo = %record.memo, "Record already classified, not storing again");
            return Ok(false);
        }
        match label {
            Label::Safe => self.safe.upsert(record),
            Label::Unsafe => self.unsafe_records.upsert(record),
        };
        self.safe.persist().await?;
        self.unsafe_records.persist().await?;
        Ok(true)
    }

    pub fn safe(&self) -> &[ClassifiedRecord] {
        self.safe.records()
    }

    pub fn unsafe_records(&self) -> &[ClassifiedRecord] {
        self.unsafe_records.records()
    }
}
