//! Similarity index over stored vectors.
//!
//! Distances are Euclidean (L2) for the lifetime of an index. Results are
//! ordered by non-decreasing distance with ties resolved by insertion order.

use crate::error::MemoryError;
use crate::model::RecordId;

/// Name of the distance metric, written into snapshot headers.
pub const METRIC: &str = "euclidean";

/// A single query hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Record the vector belongs to.
    pub record: RecordId,
    /// Euclidean distance to the query vector.
    pub distance: f32,
}

/// Insert/query capability over fixed-dimension vectors.
pub trait SimilarityIndex: Send + Sync {
    /// Add one vector, referencing the record it came from.
    fn insert(&mut self, vector: &[f32], record: RecordId) -> Result<(), MemoryError>;

    /// Return up to `k` nearest vectors to `vector`.
    ///
    /// Fails with [`MemoryError::EmptyIndex`] only when the index holds no
    /// vectors and `k > 0`.
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, MemoryError>;

    /// Record references in insertion order.
    fn records(&self) -> &[RecordId];

    /// Fixed dimension, once the first vector has been inserted.
    fn dimension(&self) -> Option<usize>;

    /// Number of indexed vectors.
    fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild an index from a full vector list, equivalent to inserting
    /// each entry in order.
    fn rebuild<'a, I>(dimension: Option<usize>, entries: I) -> Result<Self, MemoryError>
    where
        Self: Sized,
        I: IntoIterator<Item = (&'a [f32], RecordId)>;
}

/// Exact brute-force index over a contiguous row-major buffer.
///
/// Inserts are amortized O(1); queries scan every vector, O(n * d). Adequate
/// for conversational memories up to the low hundreds of thousands of
/// records.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    dimension: Option<usize>,
    data: Vec<f32>,
    records: Vec<RecordId>,
}

impl FlatIndex {
    /// Create an empty index whose dimension is fixed by the first insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with a pre-fixed dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            ..Self::default()
        }
    }

    fn check(&self, vector: &[f32]) -> Result<(), MemoryError> {
        validate_vector(vector)?;
        match self.dimension {
            Some(expected) if expected != vector.len() => Err(MemoryError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }),
            _ => Ok(()),
        }
    }
}

impl SimilarityIndex for FlatIndex {
    fn insert(&mut self, vector: &[f32], record: RecordId) -> Result<(), MemoryError> {
        self.check(vector)?;
        self.dimension.get_or_insert(vector.len());
        self.data.extend_from_slice(vector);
        self.records.push(record);
        Ok(())
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, MemoryError> {
        if self.records.is_empty() {
            return if k == 0 {
                Ok(Vec::new())
            } else {
                Err(MemoryError::EmptyIndex)
            };
        }
        self.check(vector)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let dimension = vector.len();

        let mut scored: Vec<(f32, usize)> = self
            .data
            .chunks_exact(dimension)
            .map(|row| euclidean(row, vector))
            .enumerate()
            .map(|(position, distance)| (distance, position))
            .collect();

        let order = |a: &(f32, usize), b: &(f32, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, order);
            scored.truncate(k);
        }
        scored.sort_unstable_by(order);

        Ok(scored
            .into_iter()
            .map(|(distance, position)| Neighbor {
                record: self.records[position],
                distance,
            })
            .collect())
    }

    fn records(&self) -> &[RecordId] {
        &self.records
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn rebuild<'a, I>(dimension: Option<usize>, entries: I) -> Result<Self, MemoryError>
    where
        I: IntoIterator<Item = (&'a [f32], RecordId)>,
    {
        let mut index = match dimension {
            Some(dimension) => Self::with_dimension(dimension),
            None => Self::new(),
        };
        for (vector, record) in entries {
            index.insert(vector, record)?;
        }
        Ok(index)
    }
}

/// Reject empty vectors and non-finite components.
pub(crate) fn validate_vector(vector: &[f32]) -> Result<(), MemoryError> {
    if vector.is_empty() {
        return Err(MemoryError::InvalidVector("vector is empty".to_string()));
    }
    if let Some(position) = vector.iter().position(|value| !value.is_finite()) {
        return Err(MemoryError::InvalidVector(format!(
            "non-finite component at position {position}"
        )));
    }
    Ok(())
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::{FlatIndex, Neighbor, SimilarityIndex};
    use crate::MemoryError;
    use pretty_assertions::assert_eq;

    fn index_of(vectors: &[[f32; 2]]) -> FlatIndex {
        let mut index = FlatIndex::new();
        for (id, vector) in vectors.iter().enumerate() {
            index.insert(vector, id as u64).expect("insert");
        }
        index
    }

    fn ids(hits: &[Neighbor]) -> Vec<u64> {
        hits.iter().map(|hit| hit.record).collect()
    }

    #[test]
    fn query_returns_k_nearest_sorted() {
        let index = index_of(&[[0.0, 0.0], [5.0, 0.0], [1.0, 0.0], [3.0, 0.0]]);
        let hits = index.query(&[0.0, 0.0], 3).expect("query");
        assert_eq!(ids(&hits), vec![0, 2, 3]);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[1].distance, 1.0);
        assert_eq!(hits[2].distance, 3.0);
    }

    #[test]
    fn query_with_fewer_vectors_than_k_returns_all() {
        let index = index_of(&[[2.0, 0.0], [1.0, 0.0]]);
        let hits = index.query(&[0.0, 0.0], 10).expect("query");
        assert_eq!(ids(&hits), vec![1, 0]);
    }

    #[test]
    fn ties_prefer_earlier_insertion() {
        let index = index_of(&[[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]]);
        let hits = index.query(&[0.0, 0.0], 2).expect("query");
        assert_eq!(ids(&hits), vec![0, 1]);
        let hits = index.query(&[0.0, 0.0], 4).expect("query");
        assert_eq!(ids(&hits), vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_index_reports_empty_only_for_positive_k() {
        let index = FlatIndex::new();
        assert!(matches!(
            index.query(&[0.0], 1),
            Err(MemoryError::EmptyIndex)
        ));
        assert_eq!(index.query(&[0.0], 0).expect("k=0"), Vec::new());
    }

    #[test]
    fn dimension_mismatch_rejected_on_insert_and_query() {
        let mut index = index_of(&[[0.0, 0.0]]);
        let err = index.insert(&[1.0, 2.0, 3.0], 1).expect_err("insert");
        assert!(matches!(
            err,
            MemoryError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(index.len(), 1);

        let err = index.query(&[1.0], 1).expect_err("query");
        assert!(matches!(
            err,
            MemoryError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn non_finite_vectors_rejected() {
        let mut index = FlatIndex::new();
        let err = index.insert(&[f32::NAN, 0.0], 0).expect_err("nan");
        assert!(matches!(err, MemoryError::InvalidVector(_)));
        let err = index.insert(&[], 0).expect_err("empty");
        assert!(matches!(err, MemoryError::InvalidVector(_)));
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn rebuild_matches_sequential_inserts() {
        let vectors = [[0.3, 0.1], [0.9, 0.4], [0.2, 0.2], [0.5, 0.5], [0.1, 0.9]];
        let sequential = index_of(&vectors);
        let rebuilt = FlatIndex::rebuild(
            None,
            vectors
                .iter()
                .enumerate()
                .map(|(id, vector)| (vector.as_slice(), id as u64)),
        )
        .expect("rebuild");

        for probe in [[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]] {
            assert_eq!(
                sequential.query(&probe, 3).expect("sequential"),
                rebuilt.query(&probe, 3).expect("rebuilt")
            );
        }
        assert_eq!(rebuilt.records(), sequential.records());
    }

    #[test]
    fn rebuild_with_fixed_dimension_rejects_mismatched_entries() {
        let vector = [1.0_f32, 2.0, 3.0];
        let err = FlatIndex::rebuild(Some(2), [(vector.as_slice(), 0)]).expect_err("rebuild");
        assert!(matches!(err, MemoryError::DimensionMismatch { .. }));
    }
}
