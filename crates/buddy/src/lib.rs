//! Public SDK surface for Buddy.
//!
//! This crate re-exports the building blocks used by the `buddy` binary and
//! provides a small initialization helper to keep consumer setup consistent.

/// Re-export for convenience.
pub use buddy_config as config;
pub use buddy_core as core;
/// Re-export for convenience.
pub use buddy_memory as memory;
pub use buddy_server as server;

/// Initialize logging through env_logger, honoring `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}
