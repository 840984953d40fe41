//! Ollama adapters for the embedding and generation collaborators.
//!
//! Both talk to Ollama's native JSON API (`/api/embed`, `/api/generate`)
//! without streaming.

use crate::error::BuddyCoreError;
use crate::provider::{Embedder, Generator};
use async_trait::async_trait;
use buddy_config::{EmbeddingConfig, GenerationConfig};
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Embedder backed by an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    /// Create an embedder for `model` served at `base_url`.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BuddyCoreError> {
        let client = build_client(timeout).map_err(BuddyCoreError::Embedding)?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            model: model.into(),
        })
    }

    /// Create an embedder from the `embedding` config block.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, BuddyCoreError> {
        Self::new(
            &config.base_url,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, BuddyCoreError> {
        let url = format!("{}/api/embed", self.base_url);
        debug!(
            "requesting embedding (model={}, text_len={})",
            self.model,
            text.len()
        );
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|err| BuddyCoreError::Embedding(format!("request to {url} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            return Err(BuddyCoreError::Embedding(format!(
                "{url} returned {status}: {body}"
            )));
        }

        let body: EmbedResponse = response.json().await.map_err(|err| {
            BuddyCoreError::Embedding(format!("failed to parse embed response: {err}"))
        })?;
        body.embeddings
            .into_iter()
            .next()
            .ok_or_else(|| BuddyCoreError::Embedding("embed response had no vectors".to_string()))
    }
}

/// Generator backed by an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    /// Create a generator for `model` served at `base_url`.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BuddyCoreError> {
        let client = build_client(timeout).map_err(BuddyCoreError::Generation)?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            model: model.into(),
        })
    }

    /// Create a generator from the `generation` config block.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, BuddyCoreError> {
        Self::new(
            &config.base_url,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, BuddyCoreError> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(
            "requesting generation (model={}, prompt_len={})",
            self.model,
            prompt.len()
        );
        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|err| {
                BuddyCoreError::Generation(format!("request to {url} failed: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            return Err(BuddyCoreError::Generation(format!(
                "{url} returned {status}: {body}"
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(|err| {
            BuddyCoreError::Generation(format!("failed to parse generate response: {err}"))
        })?;
        Ok(body.response)
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
        .map_err(|err| format!("failed to build HTTP client: {err}"))
}

/// Strip trailing slashes so paths join cleanly.
fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
