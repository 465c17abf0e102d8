//! Trove API crate - axum action server for the conversational engine.
//!
//! Exposes the turn resolver as a webhook the engine calls whenever it
//! predicts the knowledge base action, plus a health check.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
