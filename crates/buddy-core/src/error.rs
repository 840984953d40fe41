//! Error types for the core turn protocol.

use buddy_config::ConfigError;
use buddy_memory::MemoryError;
use thiserror::Error;

/// Errors returned by memory sessions and collaborator adapters.
#[derive(Debug, Error)]
pub enum BuddyCoreError {
    /// Store, index or snapshot failure.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    /// Embedding collaborator failed.
    #[error("embedding error: {0}")]
    Embedding(String),
    /// Generation collaborator failed.
    #[error("generation error: {0}")]
    Generation(String),
    /// Config could not be resolved.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuddyCoreError {
    /// Whether the failure came from an external model collaborator.
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::Generation(_))
    }
}
