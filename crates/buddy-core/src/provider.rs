//! Collaborator traits for embedding and text generation.

use crate::error::BuddyCoreError;
use async_trait::async_trait;

/// Maps text to a fixed-length vector.
///
/// The dimension is expected to stay constant for the lifetime of a memory;
/// the index rejects vectors that disagree with the first one it saw.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BuddyCoreError>;
}

/// Produces a reply for a fully rendered prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Generate a reply.
    async fn generate(&self, prompt: &str) -> Result<String, BuddyCoreError>;
}
