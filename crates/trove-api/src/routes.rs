//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use trove_core::{TroveConfig, TroveError};

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/webhook", post(handlers::webhook))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB, trackers carry full history
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the configured host and port.
pub async fn start_server(config: &TroveConfig, state: AppState) -> Result<(), TroveError> {
    let addr = format!("{}:{}", config.general.host, config.general.port);

    let router = create_router(state);

    tracing::info!("Starting action server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TroveError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| TroveError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
