//! Record model stored by the vector memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record identifier; strictly increasing within a store.
pub type RecordId = u64;

/// Origin of a stored record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Seed placeholder written when a store is created.
    System,
    /// User-authored query.
    User,
    /// Agent-generated reply.
    Agent,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Agent => "agent",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted memory record. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Record identifier.
    pub id: RecordId,
    /// Role that produced the text.
    pub role: Role,
    /// Record content.
    pub text: String,
    /// Embedding of `text`.
    pub vector: Vec<f32>,
    /// Logical sequence position in the store.
    pub created_at: u64,
    /// Wall-clock time the record was appended. Informational only.
    pub recorded_at: DateTime<Utc>,
}
