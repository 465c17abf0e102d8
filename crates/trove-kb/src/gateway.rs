//! Knowledge base gateway: typed searches and lookups over a document store.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::document::{display_value, DocumentRegistry, DocumentType};
use crate::error::KbError;
use crate::store::{DocumentStore, Hit, SearchRequest};

/// Result cap used when the caller gives no limit.
pub const DEFAULT_LIMIT: usize = 5;

/// Reserved key holding the rendered representation of an object.
pub const KEY_NAME: &str = "name";
/// Reserved key holding the store identifier of an object.
pub const KEY_ID: &str = "id";

/// One attribute constraint taken from the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeFilter {
    pub name: String,
    pub value: Value,
    /// Entity role, used as comparison operator by range attributes.
    pub role: Option<String>,
}

impl AttributeFilter {
    pub fn new(name: impl Into<String>, value: Value, role: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
            role,
        }
    }
}

/// A store hit flattened to attribute values plus `name` and `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedObject {
    fields: Map<String, Value>,
}

impl NormalizedObject {
    /// Normalize a raw hit of the given type.
    ///
    /// Every declared attribute gets a key (null if the document lacks it);
    /// `name` and `id` are set last and take precedence.
    pub fn from_hit(document_type: &dyn DocumentType, hit: &Hit) -> Self {
        let mut fields: Map<String, Value> = document_type
            .attributes()
            .iter()
            .map(|a| {
                (
                    a.name().to_string(),
                    a.extract(&hit.source).cloned().unwrap_or(Value::Null),
                )
            })
            .collect();
        fields.insert(
            KEY_NAME.to_string(),
            Value::String(document_type.render(&hit.source)),
        );
        fields.insert(KEY_ID.to_string(), Value::String(hit.id.clone()));
        Self { fields }
    }

    pub fn id(&self) -> &str {
        self.fields.get(KEY_ID).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.fields.get(KEY_NAME).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Value of `key` rendered as text, if present and non-null.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_null()).map(display_value)
    }
}

/// Gateway between the turn resolver and the document store.
///
/// Holds no per-turn state and is shared by reference across turns.
pub struct KnowledgeBase {
    registry: DocumentRegistry,
    store: Arc<dyn DocumentStore>,
    default_limit: usize,
}

impl KnowledgeBase {
    pub fn new(registry: DocumentRegistry, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            registry,
            store,
            default_limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    pub fn attributes_of(&self, object_type: &str) -> Vec<String> {
        self.registry.attributes_of(object_type)
    }

    pub fn key_attribute_of(&self, object_type: &str) -> &str {
        self.registry.key_attribute_of(object_type)
    }

    /// Build the conjunctive search for `filters`, capped at `limit`.
    ///
    /// Returns the resolved type and request, or `None` for unknown types.
    /// Filters on attributes the type does not declare are dropped.
    pub fn build_search(
        &self,
        object_type: &str,
        filters: &[AttributeFilter],
        limit: Option<usize>,
    ) -> Option<(&dyn DocumentType, SearchRequest)> {
        let document_type = self.registry.get(object_type)?;
        let must = filters
            .iter()
            .filter_map(|f| match document_type.attribute(&f.name) {
                Some(attribute) => Some(attribute.build_query(&f.value, f.role.as_deref())),
                None => {
                    warn!(object_type, attribute = %f.name, "Ignoring filter on undeclared attribute");
                    None
                }
            })
            .collect();
        let request = SearchRequest {
            size: limit.unwrap_or(self.default_limit),
            must,
        };
        Some((document_type, request))
    }

    /// List objects of `object_type` matching every filter.
    ///
    /// Unknown types yield an empty list.
    pub async fn list_objects(
        &self,
        object_type: &str,
        filters: &[AttributeFilter],
        limit: Option<usize>,
    ) -> Result<Vec<NormalizedObject>, KbError> {
        let Some((document_type, request)) = self.build_search(object_type, filters, limit) else {
            return Ok(Vec::new());
        };
        let index = document_type.index();

        info!(object_type, index, query = ?request, "Searching knowledge base");
        let hits = self.store.search(index, &request).await?;
        Ok(hits
            .iter()
            .map(|hit| NormalizedObject::from_hit(document_type, hit))
            .collect())
    }

    /// Fetch a single object by identifier.
    ///
    /// Unknown types and missing identifiers yield `None`.
    pub async fn get_object(
        &self,
        object_type: &str,
        identifier: &str,
    ) -> Result<Option<NormalizedObject>, KbError> {
        let Some(document_type) = self.registry.get(object_type) else {
            return Ok(None);
        };
        if identifier.is_empty() {
            return Ok(None);
        }

        let index = document_type.index();
        info!(object_type, index, identifier, "Retrieving object");
        let hit = self.store.get(index, identifier).await?;
        Ok(hit.map(|hit| NormalizedObject::from_hit(document_type, &hit)))
    }
}
