//! Core turn protocol for Buddy.
//!
//! This crate owns the collaborator traits, the Ollama adapters, the prompt
//! template and the memory session that drives each conversational turn.

pub mod error;
pub mod ollama;
pub mod prompt;
pub mod provider;
pub mod session;

pub use error::BuddyCoreError;
/// Ollama-backed collaborators.
pub use ollama::{OllamaEmbedder, OllamaGenerator};
pub use prompt::PromptTemplate;
/// Collaborator traits implemented by model adapters and test doubles.
pub use provider::{Embedder, Generator};
/// Turn protocol entry points.
pub use session::{
    Durability, MemorySession, SessionSettings, SessionStats, TurnOutcome, TurnState,
};
