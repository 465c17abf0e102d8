//! Turn resolution for knowledge base conversations.
//!
//! Reads a snapshot of the conversation slots, decides what the user is
//! asking for, queries the knowledge base and answers with utterances plus
//! the slot events that carry context into the next turn.

pub mod error;
pub mod mention;
pub mod render;
pub mod resolver;
pub mod state;

pub use error::ChatError;
pub use mention::{object_name, resolve_mention};
pub use render::{sanitize, Utterance};
pub use resolver::{attribute_filters, select_mode, Mode, TurnOutcome, TurnResolver};
pub use state::{ConversationState, Entity, SlotEvent};
