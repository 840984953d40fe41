//! Error types for memory operations.

use crate::model::RecordId;
use std::path::PathBuf;

/// Errors returned by the store, index and snapshot codec.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// IO error while reading a snapshot.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot contents could not be decoded into valid records.
    #[error("corrupt snapshot at {}: {reason}", path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },
    /// Snapshot could not be written; the previous snapshot is untouched.
    #[error("failed to persist snapshot to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Vector length differs from the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Query against an index holding no vectors.
    #[error("similarity index is empty")]
    EmptyIndex,
    /// Vector is empty or contains non-finite components.
    #[error("invalid vector: {0}")]
    InvalidVector(String),
    /// Index returned a reference the store does not hold.
    #[error("index references unknown record: {0}")]
    DanglingReference(RecordId),
}
