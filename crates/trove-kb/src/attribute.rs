//! Per-attribute query semantics.
//!
//! Every attribute of a document type is bound to one [`AttributeKind`],
//! which decides how a conversational value becomes a store query fragment.

use serde_json::{Map, Value};

/// Role value that turns a range attribute back into an equality match.
pub const ROLE_EQUAL: &str = "eq";

/// Store-agnostic query fragment for a single field.
///
/// The wire encoding belongs to the store backend.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFragment {
    /// Token-level match against the field.
    Match { field: String, value: Value },
    /// The value must appear in the field as a contiguous phrase.
    MatchPhrase { field: String, value: Value },
    /// Comparison bound; `op` is passed through to the store unchecked.
    Range {
        field: String,
        op: String,
        value: Value,
    },
}

impl QueryFragment {
    /// Field the fragment applies to.
    pub fn field(&self) -> &str {
        match self {
            QueryFragment::Match { field, .. }
            | QueryFragment::MatchPhrase { field, .. }
            | QueryFragment::Range { field, .. } => field,
        }
    }
}

/// Query strategy of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Plain match; the role is ignored.
    Default,
    /// Phrase match; the role is ignored.
    Text,
    /// Numeric or date field compared using the entity role.
    Range,
}

/// An attribute of a document type together with its query strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    kind: AttributeKind,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn plain(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Default)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Text)
    }

    pub fn range(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Range)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Read this attribute's value from a raw document.
    pub fn extract<'a>(&self, document: &'a Map<String, Value>) -> Option<&'a Value> {
        document.get(&self.name)
    }

    /// Build the query fragment for `value`.
    ///
    /// Range attributes use `role` as the comparison operator. A missing role
    /// or [`ROLE_EQUAL`] falls back to a plain match.
    pub fn build_query(&self, value: &Value, role: Option<&str>) -> QueryFragment {
        let field = self.name.clone();
        let value = value.clone();
        match (self.kind, role) {
            (AttributeKind::Text, _) => QueryFragment::MatchPhrase { field, value },
            (AttributeKind::Range, Some(op)) if op != ROLE_EQUAL => QueryFragment::Range {
                field,
                op: op.to_string(),
                value,
            },
            _ => QueryFragment::Match { field, value },
        }
    }
}
