//! `RecordStore` trait — the contract every classification cache follows.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::pipeline::types::ClassifiedRecord;

/// An ordered set of classified records keyed on the full
/// (description, memo, amount) triple.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether a structurally equal record is already stored.
    fn exists(&self, record: &ClassifiedRecord) -> bool;

    /// Append `record` unless an equal one exists. Returns `true` if added.
    ///
    /// Only touches memory; call `persist` to flush.
    fn upsert(&mut self, record: ClassifiedRecord) -> bool;

    /// All records in insertion order.
    fn records(&self) -> &[ClassifiedRecord];

    /// Write the full contents to the backing medium.
    async fn persist(&self) -> Result<(), StoreError>;

    fn len(&self) -> usize {
        self.records().len()
    }

    fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}
