//! Store and index kept in lockstep.

use crate::error::MemoryError;
use crate::index::{FlatIndex, SimilarityIndex};
use crate::model::{Record, RecordId, Role};
use crate::store::VectorStore;
use log::debug;

/// A record returned by recall together with its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Recalled {
    pub record: Record,
    pub distance: f32,
}

/// Vector store plus the similarity index derived from it.
///
/// Every ingest goes through the index first, so a rejected vector leaves
/// both halves untouched and the index always mirrors the store.
#[derive(Debug, Clone)]
pub struct VectorMemory<I = FlatIndex> {
    store: VectorStore,
    index: I,
}

impl VectorMemory<FlatIndex> {
    /// Create an empty memory backed by a [`FlatIndex`].
    pub fn new() -> Self {
        Self {
            store: VectorStore::new(),
            index: FlatIndex::new(),
        }
    }
}

impl Default for VectorMemory<FlatIndex> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: SimilarityIndex> VectorMemory<I> {
    /// Rebuild the index from a loaded store.
    pub fn from_store(store: VectorStore) -> Result<Self, MemoryError> {
        let index = I::rebuild(
            store.dimension(),
            store
                .all()
                .iter()
                .map(|record| (record.vector.as_slice(), record.id)),
        )?;
        debug!(
            "rebuilt similarity index (records={}, dimension={:?})",
            index.len(),
            index.dimension()
        );
        Ok(Self { store, index })
    }

    /// Index and append a record.
    pub fn ingest(
        &mut self,
        role: Role,
        text: impl Into<String>,
        vector: Vec<f32>,
    ) -> Result<Record, MemoryError> {
        self.index.insert(&vector, self.store.next_id())?;
        Ok(self.store.append(role, text, vector).clone())
    }

    /// Return up to `k` records nearest to `vector`, nearest first.
    pub fn recall(&self, vector: &[f32], k: usize) -> Result<Vec<Recalled>, MemoryError> {
        self.index
            .query(vector, k)?
            .into_iter()
            .map(|hit| {
                let record = self
                    .store
                    .get(hit.record)
                    .ok_or(MemoryError::DanglingReference(hit.record))?;
                Ok(Recalled {
                    record: record.clone(),
                    distance: hit.distance,
                })
            })
            .collect()
    }

    /// Whether the index references exactly the stored records, in order.
    pub fn in_parity(&self) -> bool {
        let ids: Vec<RecordId> = self.store.all().iter().map(|record| record.id).collect();
        ids.as_slice() == self.index.records()
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.index.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::VectorMemory;
    use crate::{MemoryError, Role, SimilarityIndex};
    use pretty_assertions::assert_eq;

    #[test]
    fn ingest_keeps_store_and_index_in_parity() {
        let mut memory = VectorMemory::new();
        memory
            .ingest(Role::System, "initial memory", vec![0.0, 0.0])
            .expect("seed");
        memory
            .ingest(Role::User, "hello", vec![1.0, 0.0])
            .expect("user");
        assert!(memory.in_parity());
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.index().len(), 2);
    }

    #[test]
    fn rejected_vector_mutates_nothing() {
        let mut memory = VectorMemory::new();
        memory
            .ingest(Role::User, "hello", vec![1.0, 0.0])
            .expect("user");
        let err = memory
            .ingest(Role::Agent, "bad", vec![1.0, 0.0, 0.0])
            .expect_err("mismatch");
        assert!(matches!(err, MemoryError::DimensionMismatch { .. }));
        assert_eq!(memory.len(), 1);
        assert!(memory.in_parity());
    }

    #[test]
    fn recall_includes_self_match_at_distance_zero() {
        let mut memory = VectorMemory::new();
        memory
            .ingest(Role::System, "initial memory", vec![0.0, 0.0])
            .expect("seed");
        let query = vec![3.0, 4.0];
        let inserted = memory
            .ingest(Role::User, "hello", query.clone())
            .expect("user");

        let recalled = memory.recall(&query, 10).expect("recall");
        assert_eq!(recalled.len(), 2);
        assert_eq!(recalled[0].record, inserted);
        assert_eq!(recalled[0].distance, 0.0);
        assert_eq!(recalled[1].record.text, "initial memory");
        assert_eq!(recalled[1].distance, 5.0);
    }

    #[test]
    fn from_store_rebuilds_equivalent_index() {
        let mut memory = VectorMemory::new();
        for (text, vector) in [("a", [0.1, 0.2]), ("b", [0.9, 0.1]), ("c", [0.4, 0.4])] {
            memory
                .ingest(Role::User, text, vector.to_vec())
                .expect("ingest");
        }
        let rebuilt: VectorMemory =
            VectorMemory::from_store(memory.store().clone()).expect("rebuild");
        assert!(rebuilt.in_parity());
        assert_eq!(
            rebuilt.recall(&[0.5, 0.5], 3).expect("rebuilt"),
            memory.recall(&[0.5, 0.5], 3).expect("original")
        );
    }
}
