use async_trait::async_trait;
use buddy_core::{BuddyCoreError, Generator};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct FixedGenerator {
    reply: String,
}

impl FixedGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl Generator for FixedGenerator {
    fn model_name(&self) -> &str {
        "fixed-generator"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, BuddyCoreError> {
        Ok(self.reply.clone())
    }
}

/// Replies with a fixed text and keeps every prompt it received.
#[derive(Debug, Clone)]
pub struct RecordingGenerator {
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl RecordingGenerator {
    pub fn new(reply: impl Into<String>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                reply: reply.into(),
                prompts: prompts.clone(),
            },
            prompts,
        )
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn model_name(&self) -> &str {
        "recording-generator"
    }

    async fn generate(&self, prompt: &str) -> Result<String, BuddyCoreError> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FailingGenerator {
    message: String,
}

impl FailingGenerator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Generator for FailingGenerator {
    fn model_name(&self) -> &str {
        "failing-generator"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, BuddyCoreError> {
        Err(BuddyCoreError::Generation(self.message.clone()))
    }
}

/// Never completes. Signals the returned [`Notify`] once a prompt arrives so
/// tests can cancel a turn mid-generation.
#[derive(Debug, Clone)]
pub struct PendingGenerator {
    entered: Arc<Notify>,
}

impl PendingGenerator {
    pub fn new() -> (Self, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        (
            Self {
                entered: entered.clone(),
            },
            entered,
        )
    }
}

#[async_trait]
impl Generator for PendingGenerator {
    fn model_name(&self) -> &str {
        "pending-generator"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, BuddyCoreError> {
        self.entered.notify_one();
        std::future::pending().await
    }
}
