//! Configuration schema for Buddy.

use serde::{Deserialize, Serialize};

/// Default Ollama endpoint shared by the embedding and generation adapters.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Root config for the Buddy assistant.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BuddyConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl BuddyConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> BuddyConfigBuilder {
        BuddyConfigBuilder::new()
    }
}

/// Builder for assembling a `BuddyConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct BuddyConfigBuilder {
    config: BuddyConfig,
}

impl BuddyConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: BuddyConfig::default(),
        }
    }

    /// Replace the memory configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the embedding adapter configuration.
    pub fn embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.config.embedding = embedding;
        self
    }

    /// Replace the generation adapter configuration.
    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.config.generation = generation;
        self
    }

    /// Replace the HTTP server configuration.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Finalize and return the built `BuddyConfig`.
    pub fn build(self) -> BuddyConfig {
        self.config
    }
}

/// Vector memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// Snapshot file; defaults to `~/.buddy/memory.jsonl`.
    #[serde(default)]
    pub path: Option<String>,
    /// Number of records recalled as context per turn.
    #[serde(default = "default_recall_k")]
    pub recall_k: usize,
    /// Text of the placeholder record seeded into a fresh store.
    #[serde(default = "default_seed_text")]
    pub seed_text: String,
    /// Drop the just-ingested query from its own recalled context.
    #[serde(default)]
    pub exclude_self_match: bool,
    /// Prefix recalled context lines with the speaker of each record.
    #[serde(default)]
    pub label_speakers: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            recall_k: default_recall_k(),
            seed_text: default_seed_text(),
            exclude_self_match: false,
            label_speakers: false,
        }
    }
}

fn default_recall_k() -> usize {
    10
}

fn default_seed_text() -> String {
    "initial memory".to_string()
}

/// Embedding model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

/// Generative model endpoint and prompt persona.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// Name the assistant is framed as in the prompt.
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_generation_model(),
            assistant_name: default_assistant_name(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_model() -> String {
    "phi3:mini".to_string()
}

fn default_assistant_name() -> String {
    "BuddyAI".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    120
}

fn default_base_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
