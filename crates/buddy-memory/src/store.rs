//! Ordered, append-only record store.

use crate::model::{Record, RecordId, Role};
use chrono::Utc;
use log::debug;

/// Canonical sequence of records in conversational order.
///
/// Ids are allocated here and are strictly increasing. Records are never
/// edited, removed or reordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorStore {
    records: Vec<Record>,
}

impl VectorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap records that are already known to be ordered.
    pub(crate) fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Id the next appended record will receive.
    pub fn next_id(&self) -> RecordId {
        self.records.last().map_or(0, |record| record.id + 1)
    }

    /// Append a record and return it.
    pub fn append(&mut self, role: Role, text: impl Into<String>, vector: Vec<f32>) -> &Record {
        let record = Record {
            id: self.next_id(),
            role,
            text: text.into(),
            vector,
            created_at: self.records.len() as u64,
            recorded_at: Utc::now(),
        };
        debug!(
            "appended record (id={}, role={}, text_len={})",
            record.id,
            record.role,
            record.text.len()
        );
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// All records in insertion order.
    pub fn all(&self) -> &[Record] {
        &self.records
    }

    /// Look up a record by id.
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records
            .binary_search_by_key(&id, |record| record.id)
            .ok()
            .map(|position| &self.records[position])
    }

    /// Vector dimension of the stored records, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.records.first().map(|record| record.vector.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
