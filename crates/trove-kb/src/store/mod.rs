//! Document store abstraction and its backends.
//!
//! The knowledge base gateway only speaks [`DocumentStore`]; backends own
//! the wire encoding of [`QueryFragment`]s.

pub mod elasticsearch;
pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::attribute::QueryFragment;
use crate::error::KbError;

pub use elasticsearch::ElasticsearchStore;
pub use memory::MemoryStore;

/// A single document returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Store-assigned identifier.
    pub id: String,
    /// Document body.
    pub source: Map<String, Value>,
}

/// Conjunctive search: every fragment in `must` has to match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Maximum number of hits to return.
    pub size: usize,
    pub must: Vec<QueryFragment>,
}

/// Read-only access to an indexed document store.
///
/// Implementations are shared across concurrently processed turns and must
/// not keep per-request state.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a search against `index`, returning hits in rank order.
    async fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<Hit>, KbError>;

    /// Point lookup by identifier; `None` if no such document exists.
    async fn get(&self, index: &str, id: &str) -> Result<Option<Hit>, KbError>;
}
