use async_trait::async_trait;
use buddy_core::{BuddyCoreError, Embedder};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Deterministic embedder: texts map to pseudo-random unit vectors derived
/// from their bytes.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "embedding dimension must be positive");
        Self { dimension }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut seed: u64 = 0xcbf29ce484222325;
        for byte in text.as_bytes() {
            seed ^= u64::from(*byte);
            seed = seed.wrapping_mul(0x100000001b3);
        }
        let mut vector: Vec<f32> = (0..self.dimension)
            .map(|i| {
                let hash = seed.wrapping_add(i as u64).wrapping_mul(0x517cc1b727220a95);
                ((hash >> 11) as f32 / (1u64 << 53) as f32) * 2.0 - 1.0
            })
            .collect();
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-embedder"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, BuddyCoreError> {
        Ok(self.vector_for(text))
    }
}

/// Embedder with scripted vectors and failures, falling back to
/// [`HashEmbedder`] for unscripted texts. Records every text it was asked
/// to embed.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    fallback: HashEmbedder,
    vectors: HashMap<String, Vec<f32>>,
    failures: HashMap<String, String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            fallback: HashEmbedder::new(dimension),
            vectors: HashMap::new(),
            failures: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return `vector` whenever `text` is embedded.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    /// Fail with an embedding error whenever `text` is embedded.
    pub fn failing_on(mut self, text: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(text.into(), message.into());
        self
    }

    /// Texts embedded so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn model_name(&self) -> &str {
        "stub-embedder"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, BuddyCoreError> {
        self.calls.lock().push(text.to_string());
        if let Some(message) = self.failures.get(text) {
            return Err(BuddyCoreError::Embedding(message.clone()));
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.vector_for(text)))
    }
}
