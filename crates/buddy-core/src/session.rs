//! Memory session: the per-turn ingest/recall/generate/ingest/persist cycle.
//!
//! A [`MemorySession`] owns the vector memory and its snapshot path behind a
//! single async lock. Each turn holds the lock from start to finish, including
//! while the generator is pending, so turns never interleave. Dropping a turn
//! future releases the lock; whatever was appended before the drop stays in
//! memory and is persisted by the next completed turn.

use crate::error::BuddyCoreError;
use crate::prompt::PromptTemplate;
use crate::provider::{Embedder, Generator};
use buddy_config::BuddyConfig;
use buddy_memory::{MemoryError, Record, Recalled, Role, VectorMemory, snapshot};
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Position of a turn within the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Received,
    QueryIngested,
    ContextRetrieved,
    ReplyGenerated,
    ReplyIngested,
    Persisted,
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Received => "received",
            TurnState::QueryIngested => "query_ingested",
            TurnState::ContextRetrieved => "context_retrieved",
            TurnState::ReplyGenerated => "reply_generated",
            TurnState::ReplyIngested => "reply_ingested",
            TurnState::Persisted => "persisted",
        }
    }

    /// Whether reaching this state changes the stored records or snapshot.
    fn is_checkpoint(&self) -> bool {
        matches!(
            self,
            TurnState::QueryIngested | TurnState::ReplyIngested | TurnState::Persisted
        )
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a completed turn reached durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Durability {
    /// Snapshot rewritten with this turn's records.
    Persisted,
    /// Snapshot write failed; records remain in memory and are retried on the
    /// next completed turn.
    Deferred { error: String },
}

impl Durability {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Durability::Persisted)
    }
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Generated reply.
    pub reply: String,
    /// Records recalled as context, nearest first.
    pub context: Vec<Recalled>,
    /// Persistence status of the turn.
    pub durability: Durability,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub records: usize,
    pub dimension: Option<usize>,
    /// Last state that changed memory or the snapshot.
    pub state: TurnState,
    pub path: PathBuf,
}

/// Tunables taken from config.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub recall_k: usize,
    pub exclude_self_match: bool,
    pub label_speakers: bool,
    pub seed_text: String,
    pub assistant_name: String,
}

impl SessionSettings {
    pub fn from_config(config: &BuddyConfig) -> Self {
        Self {
            recall_k: config.memory.recall_k,
            exclude_self_match: config.memory.exclude_self_match,
            label_speakers: config.memory.label_speakers,
            seed_text: config.memory.seed_text.clone(),
            assistant_name: config.generation.assistant_name.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&BuddyConfig::default())
    }
}

/// Store, index and snapshot path guarded together.
#[derive(Debug)]
struct MemoryEngine {
    memory: VectorMemory,
    path: PathBuf,
    state: TurnState,
}

impl MemoryEngine {
    fn advance(&mut self, turn: &mut TurnState, next: TurnState) {
        debug!("turn advanced (from={}, to={})", turn, next);
        *turn = next;
        if next.is_checkpoint() {
            self.state = next;
        }
    }
}

/// Conversational memory shared by every caller of a process.
pub struct MemorySession {
    engine: Mutex<MemoryEngine>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    prompt: PromptTemplate,
    settings: SessionSettings,
}

impl MemorySession {
    /// Open the memory at `path`: load the snapshot if present, otherwise
    /// seed a fresh store and save it immediately.
    ///
    /// A corrupt snapshot is moved aside to `<path>.corrupt` and replaced by
    /// a fresh seeded store. Other read failures are returned.
    pub async fn open(
        path: impl AsRef<Path>,
        settings: SessionSettings,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, BuddyCoreError> {
        let path = path.as_ref().to_path_buf();
        let memory = match snapshot::load(&path) {
            Ok(store) => VectorMemory::from_store(store)?,
            Err(MemoryError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                info!("no snapshot found; seeding (path={})", path.display());
                seed(&path, &settings.seed_text, embedder.as_ref()).await?
            }
            Err(MemoryError::CorruptSnapshot { reason, .. }) => {
                warn!(
                    "corrupt snapshot; starting fresh (path={}, reason={})",
                    path.display(),
                    reason
                );
                quarantine(&path);
                seed(&path, &settings.seed_text, embedder.as_ref()).await?
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            "memory session opened (path={}, records={}, dimension={:?}, embedder={}, generator={})",
            path.display(),
            memory.len(),
            memory.dimension(),
            embedder.model_name(),
            generator.model_name()
        );
        Ok(Self {
            engine: Mutex::new(MemoryEngine {
                memory,
                path,
                state: TurnState::Persisted,
            }),
            embedder,
            generator,
            prompt: PromptTemplate::new(settings.assistant_name.clone()),
            settings,
        })
    }

    /// Open the memory described by a resolved config.
    pub async fn from_config(
        config: &BuddyConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, BuddyCoreError> {
        let path = config.memory_path()?;
        Self::open(path, SessionSettings::from_config(config), embedder, generator).await
    }

    /// Run one full turn for `query`.
    ///
    /// On failure the records appended so far stay in memory: an embedding
    /// failure on the query mutates nothing, while a generation failure or a
    /// failure embedding the reply leaves the USER record without an AGENT
    /// record and skips persistence. A snapshot write failure is not an
    /// error; it is reported through [`TurnOutcome::durability`].
    pub async fn submit(&self, query: &str) -> Result<TurnOutcome, BuddyCoreError> {
        let mut engine = self.engine.lock().await;
        let mut turn = TurnState::Received;
        debug!("turn received (query_len={})", query.len());

        let query_vector = self.embedder.embed(query).await?;
        let user = engine
            .memory
            .ingest(Role::User, query, query_vector.clone())?;
        engine.advance(&mut turn, TurnState::QueryIngested);

        let context = self.recall(&engine.memory, &query_vector, user.id)?;
        engine.advance(&mut turn, TurnState::ContextRetrieved);

        let context_text = self.context_text(&context);
        let prompt = self.prompt.render(&context_text, query);
        let reply = match self.generator.generate(&prompt).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("generation failed (user_record={}, err={})", user.id, err);
                return Err(err);
            }
        };
        engine.advance(&mut turn, TurnState::ReplyGenerated);

        let reply_vector = match self.embedder.embed(&reply).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!("reply embedding failed (user_record={}, err={})", user.id, err);
                return Err(err);
            }
        };
        engine
            .memory
            .ingest(Role::Agent, reply.as_str(), reply_vector)?;
        engine.advance(&mut turn, TurnState::ReplyIngested);

        let durability = match snapshot::save(&engine.path, engine.memory.store()) {
            Ok(()) => {
                engine.advance(&mut turn, TurnState::Persisted);
                Durability::Persisted
            }
            Err(err) => {
                warn!(
                    "snapshot write deferred (path={}, err={})",
                    engine.path.display(),
                    err
                );
                Durability::Deferred {
                    error: err.to_string(),
                }
            }
        };
        info!(
            "turn completed (records={}, context={}, persisted={})",
            engine.memory.len(),
            context.len(),
            durability.is_persisted()
        );
        Ok(TurnOutcome {
            reply,
            context,
            durability,
        })
    }

    /// Record count, dimension and last checkpoint.
    pub async fn stats(&self) -> SessionStats {
        let engine = self.engine.lock().await;
        SessionStats {
            records: engine.memory.len(),
            dimension: engine.memory.dimension(),
            state: engine.state,
            path: engine.path.clone(),
        }
    }

    /// Copy of every stored record in order.
    pub async fn records(&self) -> Vec<Record> {
        let engine = self.engine.lock().await;
        engine.memory.store().all().to_vec()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Recalled texts joined by newlines, nearest first.
    fn context_text(&self, context: &[Recalled]) -> String {
        context
            .iter()
            .map(|hit| {
                let record = &hit.record;
                match record.role {
                    Role::User if self.settings.label_speakers => format!("User: {}", record.text),
                    Role::Agent if self.settings.label_speakers => {
                        format!("{}: {}", self.prompt.assistant_name(), record.text)
                    }
                    _ => record.text.clone(),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn recall(
        &self,
        memory: &VectorMemory,
        query_vector: &[f32],
        self_id: u64,
    ) -> Result<Vec<Recalled>, BuddyCoreError> {
        let k = self.settings.recall_k;
        let fetch = if self.settings.exclude_self_match {
            k.saturating_add(1)
        } else {
            k
        };
        let mut hits = match memory.recall(query_vector, fetch) {
            Ok(hits) => hits,
            Err(MemoryError::EmptyIndex) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        if self.settings.exclude_self_match {
            hits.retain(|hit| hit.record.id != self_id);
            hits.truncate(k);
        }
        Ok(hits)
    }
}

/// Build a fresh memory holding the seed placeholder and save it.
async fn seed(
    path: &Path,
    seed_text: &str,
    embedder: &dyn Embedder,
) -> Result<VectorMemory, BuddyCoreError> {
    let vector = embedder.embed(seed_text).await?;
    let mut memory = VectorMemory::new();
    memory.ingest(Role::System, seed_text, vector)?;
    snapshot::save(path, memory.store())?;
    Ok(memory)
}

/// Move a corrupt snapshot out of the way so it is not overwritten.
fn quarantine(path: &Path) {
    let mut target = path.as_os_str().to_owned();
    target.push(".corrupt");
    let target = PathBuf::from(target);
    match fs::rename(path, &target) {
        Ok(()) => info!("corrupt snapshot moved aside (path={})", target.display()),
        Err(err) => warn!(
            "failed to move corrupt snapshot aside (path={}, err={})",
            path.display(),
            err
        ),
    }
}
