//! In-process document store.
//!
//! Evaluates query fragments with simplified full-text semantics: lowercase
//! alphanumeric tokens, no stemming and no scoring. Hits come back in
//! insertion order.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{DocumentStore, Hit, SearchRequest};
use crate::attribute::QueryFragment;
use crate::document::display_value;
use crate::error::KbError;

/// Documents held in memory, grouped by index.
#[derive(Debug, Default)]
pub struct MemoryStore {
    indices: HashMap<String, Vec<Hit>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document to `index`.
    pub fn insert(&mut self, index: impl Into<String>, id: impl Into<String>, source: Map<String, Value>) {
        self.indices.entry(index.into()).or_default().push(Hit {
            id: id.into(),
            source,
        });
    }

    /// Load documents from a seed value of the form
    /// `{"<index>": [{"id": "...", ...fields}, ...], ...}`.
    ///
    /// The `id` field becomes the store identifier and is not kept in the body.
    pub fn from_seed(seed: &Value) -> Result<Self, KbError> {
        let indices = seed
            .as_object()
            .ok_or_else(|| KbError::Seed("top level must be an object of indices".to_string()))?;

        let mut store = Self::new();
        for (index, documents) in indices {
            let documents = documents
                .as_array()
                .ok_or_else(|| KbError::Seed(format!("{} must be an array", index)))?;
            for (pos, document) in documents.iter().enumerate() {
                let mut source = document
                    .as_object()
                    .cloned()
                    .ok_or_else(|| KbError::Seed(format!("{}[{}] is not an object", index, pos)))?;
                let id = match source.remove("id") {
                    Some(Value::String(s)) => s,
                    Some(Value::Number(n)) => n.to_string(),
                    _ => return Err(KbError::Seed(format!("{}[{}] has no id", index, pos))),
                };
                store.insert(index.clone(), id, source);
            }
        }
        Ok(store)
    }

    /// Read a JSON seed file, see [`MemoryStore::from_seed`].
    pub fn from_seed_file(path: &Path) -> Result<Self, KbError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KbError::Seed(format!("{}: {}", path.display(), e)))?;
        let seed: Value = serde_json::from_str(&content)
            .map_err(|e| KbError::Seed(format!("{}: {}", path.display(), e)))?;
        let store = Self::from_seed(&seed)?;
        tracing::info!(
            path = %path.display(),
            documents = store.len(),
            "Memory store seeded"
        );
        Ok(store)
    }

    /// Total number of documents across all indices.
    pub fn len(&self) -> usize {
        self.indices.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<Hit>, KbError> {
        let Some(documents) = self.indices.get(index) else {
            return Ok(Vec::new());
        };

        let mut hits = Vec::new();
        for hit in documents {
            if hits.len() >= request.size {
                break;
            }
            let mut matched = true;
            for fragment in &request.must {
                if !matches_fragment(index, &hit.source, fragment)? {
                    matched = false;
                    break;
                }
            }
            if matched {
                hits.push(hit.clone());
            }
        }
        Ok(hits)
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Hit>, KbError> {
        Ok(self
            .indices
            .get(index)
            .and_then(|docs| docs.iter().find(|h| h.id == id))
            .cloned())
    }
}

// =============================================================================
// Fragment evaluation
// =============================================================================

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Token lists of a field; arrays contribute one list per element.
fn field_tokens(value: &Value) -> Vec<Vec<String>> {
    match value {
        Value::Array(items) => items.iter().map(|v| tokens(&display_value(v))).collect(),
        other => vec![tokens(&display_value(other))],
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Numeric values of a field; arrays contribute their numeric elements.
fn field_numbers(value: &Value) -> Vec<f64> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_number).collect(),
        other => as_number(other).into_iter().collect(),
    }
}

fn matches_fragment(
    index: &str,
    source: &Map<String, Value>,
    fragment: &QueryFragment,
) -> Result<bool, KbError> {
    if let QueryFragment::Range { op, .. } = fragment {
        if !matches!(op.as_str(), "gt" | "gte" | "lt" | "lte") {
            return Err(KbError::QueryFailed {
                index: index.to_string(),
                status: 400,
                reason: format!("unknown range operator '{}'", op),
            });
        }
    }

    let Some(field) = source.get(fragment.field()) else {
        return Ok(false);
    };

    let matched = match fragment {
        QueryFragment::Match { value, .. } => {
            let numbers = field_numbers(field);
            match as_number(value) {
                // Numbers compare by value, not by token.
                Some(wanted) if !numbers.is_empty() => numbers.contains(&wanted),
                _ => {
                    let wanted = tokens(&display_value(value));
                    field_tokens(field)
                        .iter()
                        .any(|have| wanted.iter().any(|t| have.contains(t)))
                }
            }
        }
        QueryFragment::MatchPhrase { value, .. } => {
            let wanted = tokens(&display_value(value));
            !wanted.is_empty()
                && field_tokens(field)
                    .iter()
                    .any(|have| have.windows(wanted.len()).any(|w| w == wanted.as_slice()))
        }
        QueryFragment::Range { op, value, .. } => match (as_number(field), as_number(value)) {
            (Some(have), Some(bound)) => match op.as_str() {
                "gt" => have > bound,
                "gte" => have >= bound,
                "lt" => have < bound,
                _ => have <= bound,
            },
            _ => false,
        },
    };
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn library() -> MemoryStore {
        MemoryStore::from_seed(&json!({
            "book": [
                {"id": "b1", "title": "The Left Hand of Darkness", "publication_year": 1969,
                 "genres": ["Science Fiction", "Fantasy"]},
                {"id": "b2", "title": "Left Behind", "publication_year": "1995",
                 "genres": ["Thriller"]},
                {"id": "b3", "title": "Darkness Visible", "publication_year": 1990,
                 "genres": ["Memoir"]}
            ]
        }))
        .unwrap()
    }

    fn request(must: Vec<QueryFragment>) -> SearchRequest {
        SearchRequest { size: 10, must }
    }

    fn ids(hits: &[Hit]) -> Vec<&str> {
        hits.iter().map(|h| h.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_search_without_filters_respects_size() {
        let store = library();
        let hits = store
            .search("book", &SearchRequest { size: 2, must: vec![] })
            .await
            .unwrap();
        assert_eq!(ids(&hits), vec!["b1", "b2"]);
    }

    #[tokio::test]
    async fn test_match_is_token_overlap() {
        let store = library();
        let hits = store
            .search(
                "book",
                &request(vec![QueryFragment::Match {
                    field: "title".to_string(),
                    value: json!("darkness falls"),
                }]),
            )
            .await
            .unwrap();
        assert_eq!(ids(&hits), vec!["b1", "b3"]);
    }

    #[tokio::test]
    async fn test_match_compares_numbers_by_value() {
        let store = MemoryStore::from_seed(&json!({
            "rating": [
                {"id": "m1", "mean_rating": 8.0},
                {"id": "m2", "mean_rating": 8.5},
                {"id": "m3", "mean_rating": "8.5"}
            ]
        }))
        .unwrap();
        let hits = store
            .search(
                "rating",
                &request(vec![QueryFragment::Match {
                    field: "mean_rating".to_string(),
                    value: json!("8.5"),
                }]),
            )
            .await
            .unwrap();
        assert_eq!(ids(&hits), vec!["m2", "m3"]);

        let hits = store
            .search(
                "rating",
                &request(vec![QueryFragment::Match {
                    field: "mean_rating".to_string(),
                    value: json!(8),
                }]),
            )
            .await
            .unwrap();
        assert_eq!(ids(&hits), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_phrase_requires_contiguous_tokens() {
        let store = library();
        let hits = store
            .search(
                "book",
                &request(vec![QueryFragment::MatchPhrase {
                    field: "title".to_string(),
                    value: json!("left hand"),
                }]),
            )
            .await
            .unwrap();
        assert_eq!(ids(&hits), vec!["b1"]);

        let hits = store
            .search(
                "book",
                &request(vec![QueryFragment::MatchPhrase {
                    field: "title".to_string(),
                    value: json!("hand left"),
                }]),
            )
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_phrase_matches_array_elements() {
        let store = library();
        let hits = store
            .search(
                "book",
                &request(vec![QueryFragment::MatchPhrase {
                    field: "genres".to_string(),
                    value: json!("science fiction"),
                }]),
            )
            .await
            .unwrap();
        assert_eq!(ids(&hits), vec!["b1"]);
    }

    #[tokio::test]
    async fn test_range_compares_numbers_and_numeric_strings() {
        let store = library();
        let hits = store
            .search(
                "book",
                &request(vec![QueryFragment::Range {
                    field: "publication_year".to_string(),
                    op: "gte".to_string(),
                    value: json!("1990"),
                }]),
            )
            .await
            .unwrap();
        assert_eq!(ids(&hits), vec!["b2", "b3"]);
    }

    #[tokio::test]
    async fn test_fragments_are_conjunctive() {
        let store = library();
        let hits = store
            .search(
                "book",
                &request(vec![
                    QueryFragment::Match {
                        field: "title".to_string(),
                        value: json!("darkness"),
                    },
                    QueryFragment::Range {
                        field: "publication_year".to_string(),
                        op: "lt".to_string(),
                        value: json!(1980),
                    },
                ]),
            )
            .await
            .unwrap();
        assert_eq!(ids(&hits), vec!["b1"]);
    }

    #[tokio::test]
    async fn test_unknown_range_operator_is_rejected() {
        let store = library();
        let err = store
            .search(
                "book",
                &request(vec![QueryFragment::Range {
                    field: "publication_year".to_string(),
                    op: "around".to_string(),
                    value: json!(1990),
                }]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, KbError::QueryFailed { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_unknown_index_is_empty() {
        let store = library();
        let hits = store.search("movie", &request(vec![])).await.unwrap();
        assert!(hits.is_empty());
        assert!(store.get("movie", "b1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let store = library();
        let hit = store.get("book", "b2").await.unwrap().unwrap();
        assert_eq!(hit.source["title"], json!("Left Behind"));
        assert!(!hit.source.contains_key("id"));
        assert!(store.get("book", "b9").await.unwrap().is_none());
    }

    // ---- Seeding ----

    #[test]
    fn test_seed_accepts_numeric_ids() {
        let store = MemoryStore::from_seed(&json!({"rating": [{"id": 42, "mean_rating": 7.1}]})).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_seed_rejects_missing_id() {
        let err = MemoryStore::from_seed(&json!({"book": [{"title": "Anonymous"}]})).unwrap_err();
        assert_eq!(err.to_string(), "invalid seed data: book[0] has no id");
    }

    #[test]
    fn test_seed_rejects_non_array_index() {
        assert!(MemoryStore::from_seed(&json!({"book": {"id": "b1"}})).is_err());
        assert!(MemoryStore::from_seed(&json!([])).is_err());
    }

    #[test]
    fn test_seed_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"movie": [{"id": "m1", "title": "Alien"}]}"#)
            .unwrap();
        let store = MemoryStore::from_seed_file(file.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_seed_file_missing() {
        let err = MemoryStore::from_seed_file(Path::new("/nonexistent/seed.json")).unwrap_err();
        assert!(matches!(err, KbError::Seed(_)));
    }
}
