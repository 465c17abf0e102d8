//! Utterances sent back to the user.
//!
//! All free text goes through [`sanitize`] so that braces and brackets in
//! store data cannot be read as response-template syntax downstream.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use trove_kb::document::display_value;
use trove_kb::AttributeFilter;

/// Response template asking the user to rephrase.
pub const TEMPLATE_ASK_REPHRASE: &str = "utter_ask_rephrase";

const APOLOGY: &str =
    "Sorry, I can't reach the knowledge base right now. Please try again in a moment.";

static TEMPLATE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[{}\[\]]").expect("Invalid sanitize regex"));

/// Strip `{`, `}`, `[` and `]`.
pub fn sanitize(text: &str) -> String {
    TEMPLATE_CHARS.replace_all(text, "").into_owned()
}

/// One message for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Utterance {
    /// Literal text.
    Text { text: String },
    /// A named response defined by the conversational engine.
    Template { response: String },
}

impl Utterance {
    /// Text utterance, sanitized.
    pub fn text(text: impl AsRef<str>) -> Self {
        Utterance::Text {
            text: sanitize(text.as_ref()),
        }
    }

    pub fn ask_rephrase() -> Self {
        Utterance::Template {
            response: TEMPLATE_ASK_REPHRASE.to_string(),
        }
    }

    pub fn apology() -> Self {
        Utterance::text(APOLOGY)
    }
}

fn filters_repr(filters: &[AttributeFilter]) -> String {
    if filters.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = filters
        .iter()
        .map(|f| format!("{}: {}", f.name, display_value(&f.value)))
        .collect();
    format!(" with {}", parts.join(", "))
}

/// Utterances for a listing: a header plus one numbered line per object,
/// or a single not-found message.
pub fn object_list(
    object_type: &str,
    rendered: &[String],
    filters: &[AttributeFilter],
) -> Vec<Utterance> {
    let with = filters_repr(filters);
    if rendered.is_empty() {
        return vec![Utterance::text(format!(
            "I could not find any {}s{}.",
            object_type, with
        ))];
    }

    let mut utterances = Vec::with_capacity(rendered.len() + 1);
    utterances.push(Utterance::text(format!(
        "I found the following {}s{}:",
        object_type, with
    )));
    for (i, repr) in rendered.iter().enumerate() {
        utterances.push(Utterance::text(format!("{}: {}", i + 1, repr)));
    }
    utterances
}

pub fn attribute_value(value: &str) -> Utterance {
    Utterance::text(format!("{}.", value))
}

pub fn missing_attribute_value(attribute: &str, object_name: &str) -> Utterance {
    Utterance::text(format!(
        "Did not find a valid value for attribute '{}' for object '{}'.",
        attribute, object_name
    ))
}

pub fn joined_object(
    object_repr: &str,
    object_type: &str,
    last_object_type: &str,
    last_object_repr: &str,
) -> Utterance {
    Utterance::text(format!(
        "{} is the {} for {} {}.",
        object_repr, object_type, last_object_type, last_object_repr
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_strips_template_characters() {
        assert_eq!(sanitize("Sci-Fi [2020]"), "Sci-Fi 2020");
        assert_eq!(sanitize("{title} from {year}"), "title from year");
        assert_eq!(sanitize("plain text"), "plain text");
    }

    #[test]
    fn test_text_utterance_is_sanitized() {
        assert_eq!(
            Utterance::text("[Director's Cut]"),
            Utterance::Text {
                text: "Director's Cut".to_string()
            }
        );
    }

    #[test]
    fn test_utterance_serialization() {
        assert_eq!(
            serde_json::to_value(Utterance::text("hi")).unwrap(),
            json!({"text": "hi"})
        );
        assert_eq!(
            serde_json::to_value(Utterance::ask_rephrase()).unwrap(),
            json!({"response": "utter_ask_rephrase"})
        );
    }

    #[test]
    fn test_object_list_without_filters() {
        let rendered = vec!["Dune from 1965".to_string(), "Emma from 1815".to_string()];
        assert_eq!(
            object_list("book", &rendered, &[]),
            vec![
                Utterance::text("I found the following books:"),
                Utterance::text("1: Dune from 1965"),
                Utterance::text("2: Emma from 1815"),
            ]
        );
    }

    #[test]
    fn test_object_list_names_filters() {
        let filters = vec![
            AttributeFilter::new("genres", json!("Drama"), None),
            AttributeFilter::new("publication_year", json!(1990), Some("gt".to_string())),
        ];
        let utterances = object_list("movie", &["Heat from 1995".to_string()], &filters);
        assert_eq!(
            utterances[0],
            Utterance::text("I found the following movies with genres: Drama, publication_year: 1990:")
        );
    }

    #[test]
    fn test_object_list_not_found() {
        let filters = vec![AttributeFilter::new("author", json!("Nobody [Jr]"), None)];
        assert_eq!(
            object_list("book", &[], &filters),
            vec![Utterance::text("I could not find any books with author: Nobody Jr.")]
        );
    }

    #[test]
    fn test_attribute_messages() {
        assert_eq!(
            attribute_value("Frank Herbert"),
            Utterance::text("Frank Herbert.")
        );
        assert_eq!(
            missing_attribute_value("summary", "Dune from 1965"),
            Utterance::text(
                "Did not find a valid value for attribute 'summary' for object 'Dune from 1965'."
            )
        );
    }

    #[test]
    fn test_joined_object() {
        assert_eq!(
            joined_object("8.5 out of 10 (1200 votes)", "rating", "movie", "Alien from 1979"),
            Utterance::text("8.5 out of 10 (1200 votes) is the rating for movie Alien from 1979.")
        );
    }
}
