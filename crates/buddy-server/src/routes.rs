//! HTTP route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use buddy_core::{BuddyCoreError, MemorySession};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub records: usize,
    pub dimension: Option<usize>,
}

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

/// Chat response body.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    /// False when the snapshot write failed and durability was deferred.
    pub persisted: bool,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub code: &'static str,
}

impl ErrorResponse {
    fn invalid_query(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.to_string(),
            code: "INVALID_QUERY",
        }
    }
}

impl From<BuddyCoreError> for ErrorResponse {
    fn from(err: BuddyCoreError) -> Self {
        let (status, code) = match &err {
            BuddyCoreError::Embedding(_) => (StatusCode::BAD_GATEWAY, "EMBEDDING_ERROR"),
            BuddyCoreError::Generation(_) => (StatusCode::BAD_GATEWAY, "GENERATION_ERROR"),
            BuddyCoreError::Memory(_) => (StatusCode::INTERNAL_SERVER_ERROR, "MEMORY_ERROR"),
            BuddyCoreError::Config(_) | BuddyCoreError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };
        Self {
            status,
            error: err.to_string(),
            code,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

pub async fn root() -> &'static str {
    "Buddy is listening. POST /chat with {\"query\": \"...\"}."
}

/// Health check endpoint.
pub async fn health(State(session): State<Arc<MemorySession>>) -> Json<HealthResponse> {
    let stats = session.stats().await;
    Json(HealthResponse {
        status: "ok",
        records: stats.records,
        dimension: stats.dimension,
    })
}

/// Run one turn for the submitted query.
pub async fn chat(
    State(session): State<Arc<MemorySession>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ErrorResponse> {
    if request.query.trim().is_empty() {
        return Err(ErrorResponse::invalid_query("query must not be empty"));
    }
    info!("chat request (query_len={})", request.query.len());

    let outcome = session.submit(&request.query).await.map_err(|err| {
        error!("turn failed (err={})", err);
        ErrorResponse::from(err)
    })?;
    Ok(Json(ChatResponse {
        response: outcome.reply,
        persisted: outcome.durability.is_persisted(),
    }))
}
