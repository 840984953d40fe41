//! Test helpers shared across Buddy crates.

pub mod embedder;
pub mod generator;

pub use embedder::{HashEmbedder, StubEmbedder};
pub use generator::{FailingGenerator, FixedGenerator, PendingGenerator, RecordingGenerator};
