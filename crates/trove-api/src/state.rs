//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use trove_chat::TurnResolver;
use trove_core::TroveConfig;

/// Shared application state.
///
/// Read-only after startup; all fields use `Arc` for cheap cloning across
/// handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<TroveConfig>,
    /// Turn resolver over the shared knowledge base.
    pub resolver: Arc<TurnResolver>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: TroveConfig, resolver: TurnResolver) -> Self {
        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            start_time: Instant::now(),
        }
    }
}
