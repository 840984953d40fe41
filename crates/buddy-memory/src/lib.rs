//! Vector memory engine for Buddy.
//!
//! Records are appended to an ordered [`VectorStore`], mirrored into a
//! [`SimilarityIndex`] for nearest-neighbor recall, and persisted as a full
//! JSONL snapshot after every completed turn.

pub mod error;
pub mod index;
pub mod memory;
pub mod model;
pub mod snapshot;
pub mod store;

/// Memory error type.
pub use error::MemoryError;
/// Similarity index abstraction and the exact brute-force implementation.
pub use index::{FlatIndex, Neighbor, SimilarityIndex};
/// Store + index pair kept in lockstep.
pub use memory::{Recalled, VectorMemory};
/// Record model.
pub use model::{Record, RecordId, Role};
/// Ordered append-only record store.
pub use store::VectorStore;
