//! HTTP transport for a Buddy memory session.
//!
//! # Endpoints
//!
//! - `GET /` - greeting
//! - `GET /health` - record count and vector dimension
//! - `POST /chat` - run one conversational turn

pub mod error;
pub mod routes;

use axum::{
    Router,
    routing::{get, post},
};
use buddy_core::MemorySession;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub use error::ServerError;

/// Create the router with all routes configured.
pub fn create_router(session: Arc<MemorySession>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/chat", post(routes::chat))
        .layer(cors)
        .with_state(session)
}

/// Serve the router on `addr` until the process is stopped.
pub async fn serve(session: Arc<MemorySession>, addr: SocketAddr) -> Result<(), ServerError> {
    let router = create_router(session);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!("buddy server listening (addr={})", addr);
    axum::serve(listener, router)
        .await
        .map_err(ServerError::Serve)
}
