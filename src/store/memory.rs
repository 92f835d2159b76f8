//! In-memory record store (nothing is persisted).

use async_trait::async_trait;

use crate::error::StoreError;
use crate::pipeline::types::ClassifiedRecord;
use crate::store::traits::RecordStore;

/// Record store that lives only for the current process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Vec<ClassifiedRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records, dropping duplicates.
    pub fn with_records(records: impl IntoIterator<Item = ClassifiedRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.upsert(record);
        }
        store
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
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
        Ok(())
    }
}
