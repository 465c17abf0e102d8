//! Turn resolver: picks a query mode from conversation state, runs it
//! against the knowledge base and reports utterances plus slot events.
//!
//! Modes, in priority order:
//! 1. no object type: ask the user to rephrase
//! 2. join: object type changed and the user mentions a prior object
//! 3. listing: no attribute of interest
//! 4. attribute lookup

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};
use trove_kb::document::display_value;
use trove_kb::{AttributeFilter, KnowledgeBase, NormalizedObject};

use crate::error::ChatError;
use crate::mention::object_name;
use crate::render::{self, Utterance};
use crate::state::{
    ConversationState, Entity, SlotEvent, SLOT_ATTRIBUTE, SLOT_LAST_OBJECT, SLOT_LAST_OBJECT_TYPE,
    SLOT_LIMIT, SLOT_LISTED_OBJECTS, SLOT_MENTION, SLOT_OBJECT_TYPE,
};

/// Query mode chosen for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Clarify,
    Join,
    Listing,
    Attribute,
}

/// What a turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub mode: Mode,
    pub utterances: Vec<Utterance>,
    pub events: Vec<SlotEvent>,
}

impl TurnOutcome {
    fn new(mode: Mode, utterances: Vec<Utterance>, events: Vec<SlotEvent>) -> Self {
        Self {
            mode,
            utterances,
            events,
        }
    }

    /// Ask to rephrase and clear the mention so the next turn starts clean.
    fn rephrase(mode: Mode) -> Self {
        Self::new(
            mode,
            vec![Utterance::ask_rephrase()],
            vec![SlotEvent::reset(SLOT_MENTION)],
        )
    }

    /// Apology for a failed turn; leaves the state untouched.
    pub fn apology(mode: Mode) -> Self {
        Self::new(mode, vec![Utterance::apology()], Vec::new())
    }
}

/// Mode plus the slots it works on, decided once per turn.
enum Plan<'a> {
    Clarify,
    Join {
        object_type: &'a str,
        last_object_type: &'a str,
    },
    Listing {
        object_type: &'a str,
    },
    Attribute {
        object_type: &'a str,
    },
}

impl Plan<'_> {
    fn mode(&self) -> Mode {
        match self {
            Plan::Clarify => Mode::Clarify,
            Plan::Join { .. } => Mode::Join,
            Plan::Listing { .. } => Mode::Listing,
            Plan::Attribute { .. } => Mode::Attribute,
        }
    }
}

fn plan(state: &ConversationState) -> Plan<'_> {
    let Some(object_type) = state.object_type() else {
        return Plan::Clarify;
    };

    match state.last_object_type() {
        Some(last_object_type) if last_object_type != object_type && state.has_mention() => {
            Plan::Join {
                object_type,
                last_object_type,
            }
        }
        _ if state.attribute().is_none() => Plan::Listing { object_type },
        _ => Plan::Attribute { object_type },
    }
}

/// Select the mode for `state`. Pure; does not touch the store.
pub fn select_mode(state: &ConversationState) -> Mode {
    plan(state).mode()
}

/// Filters for every attribute of `attributes` that has a slot value.
///
/// Each filter carries the role of the first latest-message entity with the
/// same type and value, if that entity has a role.
pub fn attribute_filters(
    state: &ConversationState,
    attributes: &[String],
    entities: &[Entity],
) -> Vec<AttributeFilter> {
    attributes
        .iter()
        .filter_map(|name| {
            let value = state.slot(name)?;
            let shown = display_value(value);
            let role = entities
                .iter()
                .filter(|e| &e.entity == name && display_value(&e.value) == shown)
                .find_map(|e| e.role.clone());
            Some(AttributeFilter::new(name.clone(), value.clone(), role))
        })
        .collect()
}

/// Result cap from the limit slot; unusable values fall back to the default.
fn parse_limit(value: Option<&Value>) -> Option<usize> {
    let value = value?;
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    match parsed {
        Some(limit) if limit > 0 => Some(limit),
        _ => {
            warn!(limit = %value, "Ignoring unusable limit slot");
            None
        }
    }
}

/// Empty values are reported to the user as missing.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Resolves turns against a shared knowledge base.
pub struct TurnResolver {
    kb: Arc<KnowledgeBase>,
}

impl TurnResolver {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// Process one turn.
    ///
    /// Store faults never escape: they are logged and answered with an
    /// apology and no slot events.
    pub async fn run(&self, state: &ConversationState, entities: &[Entity]) -> TurnOutcome {
        let plan = plan(state);
        let mode = plan.mode();
        debug!(?mode, object_type = ?state.object_type(), "Resolving turn");

        match self.resolve(plan, state, entities).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(?mode, error = %e, "Knowledge base query failed");
                TurnOutcome::apology(mode)
            }
        }
    }

    async fn resolve(
        &self,
        plan: Plan<'_>,
        state: &ConversationState,
        entities: &[Entity],
    ) -> Result<TurnOutcome, ChatError> {
        match plan {
            Plan::Clarify => Ok(TurnOutcome::new(
                Mode::Clarify,
                vec![Utterance::ask_rephrase()],
                Vec::new(),
            )),
            Plan::Join {
                object_type,
                last_object_type,
            } => self.query_join(object_type, last_object_type, state).await,
            Plan::Listing { object_type } => self.query_objects(object_type, state, entities).await,
            Plan::Attribute { object_type } => self.query_attribute(object_type, state).await,
        }
    }

    async fn query_objects(
        &self,
        object_type: &str,
        state: &ConversationState,
        entities: &[Entity],
    ) -> Result<TurnOutcome, ChatError> {
        let attributes = self.kb.attributes_of(object_type);
        let filters = attribute_filters(state, &attributes, entities);
        let limit = parse_limit(state.limit());

        let objects = self.kb.list_objects(object_type, &filters, limit).await?;

        let rendered: Vec<String> = objects.iter().map(|o| o.name().to_string()).collect();
        let utterances = render::object_list(object_type, &rendered, &filters);

        let resets: Vec<SlotEvent> = attributes
            .iter()
            .filter(|a| state.slot(a).is_some())
            .map(SlotEvent::reset)
            .collect();

        if objects.is_empty() {
            return Ok(TurnOutcome::new(Mode::Listing, utterances, resets));
        }

        let key_attribute = self.kb.key_attribute_of(object_type);
        let keys: Vec<Value> = objects
            .iter()
            .map(|o| o.get(key_attribute).cloned().unwrap_or(Value::Null))
            .collect();
        let last_object = match keys.as_slice() {
            [only] => only.clone(),
            _ => Value::Null,
        };

        let mut events = vec![
            SlotEvent::set(SLOT_OBJECT_TYPE, object_type),
            SlotEvent::reset(SLOT_MENTION),
            SlotEvent::reset(SLOT_ATTRIBUTE),
            SlotEvent::set(SLOT_LAST_OBJECT, last_object),
            SlotEvent::set(SLOT_LAST_OBJECT_TYPE, object_type),
            SlotEvent::set(SLOT_LISTED_OBJECTS, Value::Array(keys)),
            SlotEvent::reset(SLOT_LIMIT),
        ];
        events.extend(resets);
        Ok(TurnOutcome::new(Mode::Listing, utterances, events))
    }

    /// Look up the mentioned object under the previous type, then the object
    /// sharing its identifier under the current type.
    ///
    /// This relies on related documents sharing identifiers across indices
    /// (a movie and its rating); it is not a general join.
    async fn query_join(
        &self,
        object_type: &str,
        last_object_type: &str,
        state: &ConversationState,
    ) -> Result<TurnOutcome, ChatError> {
        let Some(name) = object_name(state, last_object_type) else {
            return Ok(TurnOutcome::rephrase(Mode::Join));
        };
        let Some(last_object) = self.kb.get_object(last_object_type, &name).await? else {
            return Ok(TurnOutcome::rephrase(Mode::Join));
        };
        let Some(object) = self.kb.get_object(object_type, &name).await? else {
            return Ok(TurnOutcome::rephrase(Mode::Join));
        };

        let utterance = render::joined_object(
            object.name(),
            object_type,
            last_object_type,
            last_object.name(),
        );
        let events = vec![
            SlotEvent::set(SLOT_OBJECT_TYPE, last_object_type),
            SlotEvent::reset(SLOT_MENTION),
            SlotEvent::reset(SLOT_ATTRIBUTE),
            SlotEvent::set(SLOT_LAST_OBJECT, name),
            SlotEvent::set(SLOT_LAST_OBJECT_TYPE, last_object_type),
            SlotEvent::reset(SLOT_LIMIT),
        ];
        Ok(TurnOutcome::new(Mode::Join, vec![utterance], events))
    }

    async fn query_attribute(
        &self,
        object_type: &str,
        state: &ConversationState,
    ) -> Result<TurnOutcome, ChatError> {
        let (Some(attribute), Some(name)) = (state.attribute(), object_name(state, object_type))
        else {
            return Ok(TurnOutcome::rephrase(Mode::Attribute));
        };
        let Some(object) = self.kb.get_object(object_type, &name).await? else {
            return Ok(TurnOutcome::rephrase(Mode::Attribute));
        };
        let Some(value) = object.get(attribute) else {
            return Ok(TurnOutcome::rephrase(Mode::Attribute));
        };

        let utterance = if is_blank(value) {
            render::missing_attribute_value(attribute, object.name())
        } else {
            render::attribute_value(&display_value(value))
        };

        let events = vec![
            SlotEvent::set(SLOT_OBJECT_TYPE, object_type),
            SlotEvent::reset(SLOT_ATTRIBUTE),
            SlotEvent::reset(SLOT_MENTION),
            SlotEvent::set(SLOT_LAST_OBJECT, key_value(&object, self.kb.key_attribute_of(object_type))),
            SlotEvent::set(SLOT_LAST_OBJECT_TYPE, object_type),
        ];
        Ok(TurnOutcome::new(Mode::Attribute, vec![utterance], events))
    }
}

fn key_value(object: &NormalizedObject, key_attribute: &str) -> Value {
    object.get(key_attribute).cloned().unwrap_or(Value::Null)
}
