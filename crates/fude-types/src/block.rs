//! AI block attributes and controller phase.
//!
//! `BlockAttributes` is everything a block persists into the document. The
//! controller's drafts, error message and credential are ephemeral and die
//! with the node.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Node type name of the AI block in the document tree.
pub const AI_BLOCK: &str = "aiBlock";

/// Serialized attribute names.
pub const ATTR_PROMPT: &str = "prompt";
pub const ATTR_RESPONSE: &str = "response";
pub const ATTR_SELECTED_TEXT: &str = "selectedText";

/// Credential store slot shared by every block in a session.
pub const CREDENTIAL_KEY: &str = "ai-block-api-key";

/// Durable attributes of an AI block node.
///
/// All three default to the empty string. Serialized names match the
/// document schema exactly (`prompt`, `response`, `selectedText`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockAttributes {
    pub prompt: String,
    pub response: String,
    #[serde(rename = "selectedText")]
    pub selected_text: String,
}

impl BlockAttributes {
    /// Attributes for a freshly inserted block.
    pub fn with_selected_text(selected_text: impl Into<String>) -> Self {
        Self {
            selected_text: selected_text.into(),
            ..Self::default()
        }
    }

    /// Read attributes from a JSON object.
    ///
    /// Lenient: missing keys and non-string values fall back to the default,
    /// since documents may come from older or foreign writers.
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default()
        };
        Self {
            prompt: get(ATTR_PROMPT),
            response: get(ATTR_RESPONSE),
            selected_text: get(ATTR_SELECTED_TEXT),
        }
    }

    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(ATTR_PROMPT.into(), Value::String(self.prompt.clone()));
        map.insert(ATTR_RESPONSE.into(), Value::String(self.response.clone()));
        map.insert(
            ATTR_SELECTED_TEXT.into(),
            Value::String(self.selected_text.clone()),
        );
        map
    }

    /// The partial update written when a generation succeeds.
    pub fn generation_update(prompt: &str, response: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(ATTR_RESPONSE.into(), Value::String(response.to_string()));
        map.insert(ATTR_PROMPT.into(), Value::String(prompt.to_string()));
        map
    }
}

/// Controller state.
///
/// Terminal outcomes (discarded, inserted) are not phases: they destroy the
/// node instead of moving to a reachable state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// Prompt entry (initial).
    #[default]
    Editing,
    /// A generation request is in flight.
    Generating,
    /// A response is shown for review.
    Reviewing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn attributes_default_to_empty_strings() {
        let attrs = BlockAttributes::default();
        assert_eq!(attrs.prompt, "");
        assert_eq!(attrs.response, "");
        assert_eq!(attrs.selected_text, "");
    }

    #[test]
    fn serialized_names_match_schema() {
        let attrs = BlockAttributes::with_selected_text("foo bar");
        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json["selectedText"], "foo bar");
        assert_eq!(json["prompt"], "");
        assert_eq!(json["response"], "");
    }

    #[test]
    fn lenient_read_ignores_bad_values() {
        let map = serde_json::json!({
            "prompt": "p",
            "response": 42,
            "other": "ignored",
        });
        let attrs = BlockAttributes::from_json_map(map.as_object().unwrap());
        assert_eq!(attrs.prompt, "p");
        assert_eq!(attrs.response, "");
        assert_eq!(attrs.selected_text, "");
    }

    #[test]
    fn generation_update_only_touches_prompt_and_response() {
        let update = BlockAttributes::generation_update("Hello", "World");
        assert_eq!(update.len(), 2);
        assert_eq!(update[ATTR_PROMPT], "Hello");
        assert_eq!(update[ATTR_RESPONSE], "World");
    }

    #[test]
    fn phase_string_conversion() {
        assert_eq!(Phase::Generating.to_string(), "generating");
        assert_eq!(Phase::from_str("reviewing").unwrap(), Phase::Reviewing);
        assert_eq!(Phase::default(), Phase::Editing);
    }
}
