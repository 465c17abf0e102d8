//! Document types and the registry that maps object type names to them.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::attribute::Attribute;

/// Attribute used to reference objects when a type does not override it.
pub const DEFAULT_KEY_ATTRIBUTE: &str = "id";

/// Schema of one category of documents stored in its own index.
pub trait DocumentType: Send + Sync {
    /// Index (collection) holding documents of this type.
    fn index(&self) -> &str;

    /// Declared attributes, in display order.
    fn attributes(&self) -> &[Attribute];

    /// Attribute whose value identifies an object in later turns.
    fn key_attribute(&self) -> &str {
        DEFAULT_KEY_ATTRIBUTE
    }

    /// Human-readable rendering of a raw document.
    fn render(&self, document: &Map<String, Value>) -> String;

    fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes().iter().find(|a| a.name() == name)
    }
}

/// Render a JSON value the way it is shown to users.
///
/// Strings lose their quotes, arrays are comma-joined and null is empty.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn field(document: &Map<String, Value>, name: &str) -> String {
    document.get(name).map(display_value).unwrap_or_default()
}

// =============================================================================
// Built-in types
// =============================================================================

/// Books, rendered as "{title} from {publication_year}".
pub struct BookType {
    index: String,
    attributes: Vec<Attribute>,
}

impl BookType {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            attributes: vec![
                Attribute::text("title"),
                Attribute::text("author"),
                Attribute::range("publication_year"),
                Attribute::text("genres"),
                Attribute::plain("summary"),
            ],
        }
    }
}

impl DocumentType for BookType {
    fn index(&self) -> &str {
        &self.index
    }

    fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    fn render(&self, document: &Map<String, Value>) -> String {
        format!(
            "{} from {}",
            field(document, "title"),
            field(document, "publication_year")
        )
    }
}

/// Movies, rendered as "{title} from {publication_year}".
pub struct MovieType {
    index: String,
    attributes: Vec<Attribute>,
}

impl MovieType {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            attributes: vec![
                Attribute::text("title"),
                Attribute::range("publication_year"),
                Attribute::text("genres"),
                Attribute::plain("summary"),
                Attribute::text("actors"),
                Attribute::text("director"),
            ],
        }
    }
}

impl DocumentType for MovieType {
    fn index(&self) -> &str {
        &self.index
    }

    fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    fn render(&self, document: &Map<String, Value>) -> String {
        format!(
            "{} from {}",
            field(document, "title"),
            field(document, "publication_year")
        )
    }
}

/// Movie ratings, keyed by the identifier of the rated movie.
pub struct RatingType {
    index: String,
    attributes: Vec<Attribute>,
}

impl RatingType {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            attributes: vec![
                Attribute::plain("mean_rating"),
                Attribute::plain("total_votes"),
            ],
        }
    }
}

impl DocumentType for RatingType {
    fn index(&self) -> &str {
        &self.index
    }

    fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    fn render(&self, document: &Map<String, Value>) -> String {
        format!(
            "{} out of 10 ({} votes)",
            field(document, "mean_rating"),
            field(document, "total_votes")
        )
    }
}

// =============================================================================
// DocumentRegistry
// =============================================================================

/// Immutable lookup table from object type name to its schema.
///
/// Built once at startup; there is no way to add types afterwards.
pub struct DocumentRegistry {
    types: HashMap<String, Box<dyn DocumentType>>,
}

impl DocumentRegistry {
    /// Start building a registry.
    pub fn builder() -> DocumentRegistryBuilder {
        DocumentRegistryBuilder {
            types: HashMap::new(),
        }
    }

    /// Registry with the `book`, `movie` and `rating` types, each stored in
    /// an index of the same name.
    pub fn with_defaults() -> Self {
        Self::builder()
            .register("book", BookType::new("book"))
            .register("movie", MovieType::new("movie"))
            .register("rating", RatingType::new("rating"))
            .build()
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn DocumentType> {
        self.types.get(type_name).map(|t| t.as_ref())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Attribute names of a type; empty for unknown types.
    pub fn attributes_of(&self, type_name: &str) -> Vec<String> {
        self.get(type_name)
            .map(|t| t.attributes().iter().map(|a| a.name().to_string()).collect())
            .unwrap_or_default()
    }

    /// Key attribute of a type, [`DEFAULT_KEY_ATTRIBUTE`] for unknown types.
    pub fn key_attribute_of(&self, type_name: &str) -> &str {
        self.get(type_name)
            .map(|t| t.key_attribute())
            .unwrap_or(DEFAULT_KEY_ATTRIBUTE)
    }

    /// Render a raw document with its type's formatter.
    pub fn render(&self, type_name: &str, document: &Map<String, Value>) -> Option<String> {
        self.get(type_name).map(|t| t.render(document))
    }
}

/// Builder for [`DocumentRegistry`].
pub struct DocumentRegistryBuilder {
    types: HashMap<String, Box<dyn DocumentType>>,
}

impl DocumentRegistryBuilder {
    pub fn register(
        mut self,
        type_name: impl Into<String>,
        document_type: impl DocumentType + 'static,
    ) -> Self {
        self.types.insert(type_name.into(), Box::new(document_type));
        self
    }

    pub fn build(self) -> DocumentRegistry {
        DocumentRegistry { types: self.types }
    }
}
