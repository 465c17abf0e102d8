//! Resolving which object the user refers to.
//!
//! A reference is either a mention ("the second one", "it"), an explicit
//! name held in a slot named after the object type, or, failing both, the
//! last object of the conversation.

use rand::seq::IndexedRandom;

use crate::state::ConversationState;

/// Pick an element of the listed objects for an ordinal mention.
///
/// Returns `None` if `mention` is not an ordinal, `Some(None)` if it is one
/// but points outside the list.
fn ordinal(mention: &str, listed: &[String]) -> Option<Option<String>> {
    let picked = match mention {
        "LAST" => listed.last(),
        "ANY" => listed.choose(&mut rand::rng()),
        n => {
            let pos: usize = n.parse().ok().filter(|p| (1..=10).contains(p))?;
            listed.get(pos - 1)
        }
    };
    Some(picked.cloned())
}

/// Resolve the mention slot to an object identifier.
///
/// Ordinals index into the listed objects. Any other mention refers to the
/// last object, but only if that object is of `referent_type`.
pub fn resolve_mention(state: &ConversationState, referent_type: &str) -> Option<String> {
    let mention = state.mention()?;
    let listed = state.listed_objects();

    if !listed.is_empty() {
        if let Some(picked) = ordinal(&mention, &listed) {
            return picked;
        }
    }

    if state.last_object_type() == Some(referent_type) {
        return state.last_object();
    }
    None
}

/// Identifier of the object of `referent_type` the user is talking about.
pub fn object_name(state: &ConversationState, referent_type: &str) -> Option<String> {
    if state.has_mention() {
        return resolve_mention(state, referent_type);
    }

    if let Some(name) = state.slot(referent_type).and_then(|v| v.as_str()) {
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    state.last_object()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        SLOT_LAST_OBJECT, SLOT_LAST_OBJECT_TYPE, SLOT_LISTED_OBJECTS, SLOT_MENTION,
    };
    use serde_json::json;

    fn listed_movies() -> ConversationState {
        ConversationState::new()
            .with_slot(SLOT_LAST_OBJECT_TYPE, "movie")
            .with_slot(SLOT_LISTED_OBJECTS, json!(["m1", "m2", "m3"]))
    }

    #[test]
    fn test_ordinal_mentions() {
        let state = listed_movies().with_slot(SLOT_MENTION, "2");
        assert_eq!(resolve_mention(&state, "movie").as_deref(), Some("m2"));

        let state = listed_movies().with_slot(SLOT_MENTION, "LAST");
        assert_eq!(resolve_mention(&state, "movie").as_deref(), Some("m3"));

        let state = listed_movies().with_slot(SLOT_MENTION, "1");
        assert_eq!(resolve_mention(&state, "rating").as_deref(), Some("m1"));
    }

    #[test]
    fn test_any_picks_a_listed_object() {
        let state = listed_movies().with_slot(SLOT_MENTION, "ANY");
        let picked = resolve_mention(&state, "movie").unwrap();
        assert!(["m1", "m2", "m3"].contains(&picked.as_str()));
    }

    #[test]
    fn test_ordinal_out_of_range_is_unresolved() {
        let state = listed_movies()
            .with_slot(SLOT_MENTION, "5")
            .with_slot(SLOT_LAST_OBJECT, "m1");
        assert!(resolve_mention(&state, "movie").is_none());
    }

    #[test]
    fn test_pronoun_uses_last_object_of_same_type() {
        let state = ConversationState::new()
            .with_slot(SLOT_MENTION, "it")
            .with_slot(SLOT_LAST_OBJECT, "m7")
            .with_slot(SLOT_LAST_OBJECT_TYPE, "movie");
        assert_eq!(resolve_mention(&state, "movie").as_deref(), Some("m7"));
        assert!(resolve_mention(&state, "book").is_none());
    }

    #[test]
    fn test_ordinal_without_listing_falls_back_to_last_object() {
        let state = ConversationState::new()
            .with_slot(SLOT_MENTION, "1")
            .with_slot(SLOT_LAST_OBJECT, "b1")
            .with_slot(SLOT_LAST_OBJECT_TYPE, "book");
        assert_eq!(resolve_mention(&state, "book").as_deref(), Some("b1"));
    }

    #[test]
    fn test_object_name_prefers_explicit_name_slot() {
        let state = ConversationState::new()
            .with_slot("book", "b42")
            .with_slot(SLOT_LAST_OBJECT, "b1");
        assert_eq!(object_name(&state, "book").as_deref(), Some("b42"));
    }

    #[test]
    fn test_object_name_falls_back_to_last_object() {
        let state = ConversationState::new().with_slot(SLOT_LAST_OBJECT, "b1");
        assert_eq!(object_name(&state, "book").as_deref(), Some("b1"));
        assert!(object_name(&ConversationState::new(), "book").is_none());
    }

    #[test]
    fn test_object_name_with_unresolvable_mention() {
        let state = ConversationState::new()
            .with_slot(SLOT_MENTION, "that")
            .with_slot(SLOT_LAST_OBJECT, "b1");
        assert!(object_name(&state, "book").is_none());
    }
}
