//! Knowledge base layer for Trove.
//!
//! Models document types with per-attribute query semantics and executes
//! attribute-filtered searches and point lookups against a document store.

pub mod attribute;
pub mod document;
pub mod error;
pub mod gateway;
pub mod store;

pub use attribute::{Attribute, AttributeKind, QueryFragment};
pub use document::{DocumentRegistry, DocumentType};
pub use error::KbError;
pub use gateway::{AttributeFilter, KnowledgeBase, NormalizedObject};
pub use store::{DocumentStore, ElasticsearchStore, Hit, MemoryStore, SearchRequest};
