//! Conversation state as seen by one turn, and the slot events that update it.
//!
//! The conversational engine owns the state. A turn reads a snapshot and
//! returns [`SlotEvent`]s; the engine applies them before the next turn.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use trove_kb::document::display_value;

use crate::error::ChatError;

pub const SLOT_OBJECT_TYPE: &str = "object_type";
pub const SLOT_ATTRIBUTE: &str = "attribute";
pub const SLOT_MENTION: &str = "mention";
pub const SLOT_LAST_OBJECT: &str = "knowledge_base_last_object";
pub const SLOT_LAST_OBJECT_TYPE: &str = "knowledge_base_last_object_type";
pub const SLOT_LISTED_OBJECTS: &str = "knowledge_base_listed_objects";
pub const SLOT_LIMIT: &str = "limit";

/// An entity extracted from the latest user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity type, e.g. `publication_year`.
    pub entity: String,
    pub value: Value,
    /// Optional role tag, e.g. `gt` for "after 1990".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Entity {
    pub fn new(entity: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            entity: entity.into(),
            value: value.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Set (or, with a null value, reset) one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotEvent {
    pub name: String,
    pub value: Value,
}

impl SlotEvent {
    pub fn set(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn reset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::Null,
        }
    }
}

/// Snapshot of all slots of one conversation.
///
/// Null slots are treated as unset, and so are empty strings for the
/// string-valued control slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    slots: Map<String, Value>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from the engine's slot object.
    pub fn from_slots(slots: Value) -> Result<Self, ChatError> {
        match slots {
            Value::Object(slots) => Ok(Self { slots }),
            Value::Null => Ok(Self::default()),
            other => Err(ChatError::InvalidTracker(format!(
                "slots must be an object, got {}",
                other
            ))),
        }
    }

    pub fn with_slot(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.slots.insert(name.into(), value.into());
        self
    }

    /// Apply slot events in order.
    pub fn apply(&mut self, events: &[SlotEvent]) {
        for event in events {
            self.slots.insert(event.name.clone(), event.value.clone());
        }
    }

    /// Raw slot value; `None` when unset or null.
    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).filter(|v| !v.is_null())
    }

    fn text_slot(&self, name: &str) -> Option<&str> {
        self.slot(name).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn object_type(&self) -> Option<&str> {
        self.text_slot(SLOT_OBJECT_TYPE)
    }

    pub fn last_object_type(&self) -> Option<&str> {
        self.text_slot(SLOT_LAST_OBJECT_TYPE)
    }

    pub fn attribute(&self) -> Option<&str> {
        self.text_slot(SLOT_ATTRIBUTE)
    }

    /// Mention value, e.g. `"1"`, `"LAST"` or a pronoun.
    pub fn mention(&self) -> Option<String> {
        self.slot(SLOT_MENTION).map(display_value)
    }

    pub fn has_mention(&self) -> bool {
        self.slot(SLOT_MENTION).is_some()
    }

    /// Identifier of the object last referred to.
    pub fn last_object(&self) -> Option<String> {
        self.slot(SLOT_LAST_OBJECT)
            .map(display_value)
            .filter(|s| !s.is_empty())
    }

    /// Identifiers of the objects listed by the previous listing turn.
    pub fn listed_objects(&self) -> Vec<String> {
        match self.slot(SLOT_LISTED_OBJECTS) {
            Some(Value::Array(items)) => items.iter().map(display_value).collect(),
            _ => Vec::new(),
        }
    }

    pub fn limit(&self) -> Option<&Value> {
        self.slot(SLOT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_state_has_nothing_set() {
        let state = ConversationState::new();
        assert!(state.object_type().is_none());
        assert!(state.attribute().is_none());
        assert!(!state.has_mention());
        assert!(state.last_object().is_none());
        assert!(state.listed_objects().is_empty());
        assert!(state.limit().is_none());
    }

    #[test]
    fn test_null_and_empty_strings_are_unset() {
        let state = ConversationState::new()
            .with_slot(SLOT_OBJECT_TYPE, "")
            .with_slot(SLOT_ATTRIBUTE, Value::Null)
            .with_slot(SLOT_MENTION, Value::Null);
        assert!(state.object_type().is_none());
        assert!(state.attribute().is_none());
        assert!(!state.has_mention());
    }

    #[test]
    fn test_numeric_identifiers_read_as_text() {
        let state = ConversationState::new()
            .with_slot(SLOT_LAST_OBJECT, 42)
            .with_slot(SLOT_LISTED_OBJECTS, json!([7, "m2"]));
        assert_eq!(state.last_object().as_deref(), Some("42"));
        assert_eq!(state.listed_objects(), vec!["7", "m2"]);
    }

    #[test]
    fn test_apply_sets_and_resets() {
        let mut state = ConversationState::new()
            .with_slot(SLOT_OBJECT_TYPE, "book")
            .with_slot(SLOT_MENTION, "1");
        state.apply(&[
            SlotEvent::set(SLOT_LAST_OBJECT_TYPE, "book"),
            SlotEvent::reset(SLOT_MENTION),
        ]);
        assert_eq!(state.last_object_type(), Some("book"));
        assert!(!state.has_mention());
    }

    #[test]
    fn test_from_slots() {
        let state = ConversationState::from_slots(json!({"object_type": "movie"})).unwrap();
        assert_eq!(state.object_type(), Some("movie"));
        assert_eq!(
            ConversationState::from_slots(Value::Null).unwrap(),
            ConversationState::new()
        );
        assert!(matches!(
            ConversationState::from_slots(json!(["object_type"])),
            Err(ChatError::InvalidTracker(_))
        ));
    }

    #[test]
    fn test_entity_deserializes_without_role() {
        let entity: Entity =
            serde_json::from_value(json!({"entity": "genres", "value": "Drama", "start": 4})).unwrap();
        assert_eq!(entity, Entity::new("genres", "Drama"));

        let entity: Entity = serde_json::from_value(
            json!({"entity": "publication_year", "value": "1990", "role": "gt"}),
        )
        .unwrap();
        assert_eq!(entity.role.as_deref(), Some("gt"));
    }
}
