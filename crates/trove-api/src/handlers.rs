//! Route handler functions.
//!
//! The webhook speaks the action-server protocol: a tracker snapshot in,
//! slot events and responses out.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use trove_chat::{select_mode, ConversationState, Entity, SlotEvent, TurnOutcome, Utterance};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

/// Request body for POST /webhook.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub next_action: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub tracker: Tracker,
}

/// Tracker snapshot sent by the conversational engine.
#[derive(Debug, Default, Deserialize)]
pub struct Tracker {
    #[serde(default)]
    pub slots: Value,
    #[serde(default)]
    pub latest_message: LatestMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct LatestMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

// =============================================================================
// Response types
// =============================================================================

/// One event for the engine to apply to the tracker.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct EventBody {
    pub event: String,
    pub name: String,
    pub value: Value,
}

impl From<SlotEvent> for EventBody {
    fn from(event: SlotEvent) -> Self {
        Self {
            event: "slot".to_string(),
            name: event.name,
            value: event.value,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub events: Vec<EventBody>,
    pub responses: Vec<Utterance>,
}

impl From<TurnOutcome> for WebhookResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            events: outcome.events.into_iter().map(EventBody::from).collect(),
            responses: outcome.utterances,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub action: String,
    pub object_types: Vec<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /webhook - run one knowledge base turn.
pub async fn webhook(
    State(state): State<AppState>,
    Json(request): Json<WebhookRequest>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let kb_config = &state.config.knowledge_base;
    if request.next_action != kb_config.action_name {
        return Err(ApiError::ActionNotFound(request.next_action));
    }

    let slots = ConversationState::from_slots(request.tracker.slots)?;
    let entities = request.tracker.latest_message.entities;
    info!(
        sender_id = request.sender_id.as_deref().unwrap_or("unknown"),
        text = request.tracker.latest_message.text.as_deref().unwrap_or(""),
        entities = entities.len(),
        "Knowledge base action requested"
    );

    let timeout = Duration::from_secs(kb_config.turn_timeout_secs);
    let outcome = match tokio::time::timeout(timeout, state.resolver.run(&slots, &entities)).await
    {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(timeout_secs = kb_config.turn_timeout_secs, "Turn timed out");
            TurnOutcome::apology(select_mode(&slots))
        }
    };

    Ok(Json(WebhookResponse::from(outcome)))
}

/// GET /health - liveness plus the object types the knowledge base serves.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let object_types = state
        .resolver
        .knowledge_base()
        .registry()
        .type_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        action: state.config.knowledge_base.action_name.clone(),
        object_types,
    })
}
