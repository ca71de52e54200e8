//! Wire types returned by the conversation service.
//!
//! The service is only reached from inside the embedded browser, so these shapes arrive
//! wrapped in the injected script's result payload. Every field the manager does not
//! strictly need is optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the cursor-paginated conversation listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingItem {
    pub uuid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(
        default = "Utc::now",
        deserialize_with = "crate::parsers::deserializers::deserialize_lenient_timestamp"
    )]
    pub updated_at: DateTime<Utc>,
}

/// Full conversation detail (`?tree=true`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub uuid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub chat_messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub block_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ChatMessage {
    /// Message text, falling back to the text blocks when the flat field is absent
    pub fn text(&self) -> String {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            return text.to_string();
        }
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter(|b| b.block_type.as_deref().is_none_or(|t| t == "text"))
            .filter_map(|b| b.text.as_deref())
            .collect();
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_item_malformed_timestamp_defaults_to_now() {
        let before = Utc::now();
        let item: ListingItem =
            serde_json::from_str(r#"{"uuid":"abc","name":"x","updated_at":"not a date"}"#).unwrap();
        assert!(item.updated_at >= before);
    }

    #[test]
    fn test_listing_item_missing_timestamp_defaults_to_now() {
        let before = Utc::now();
        let item: ListingItem = serde_json::from_str(r#"{"uuid":"abc"}"#).unwrap();
        assert!(item.name.is_none());
        assert!(item.updated_at >= before);
    }

    #[test]
    fn test_message_text_from_blocks() {
        let msg: ChatMessage = serde_json::from_str(
            r#"{"sender":"human","content":[{"type":"text","text":"one"},{"type":"tool_use"},{"type":"text","text":"two"}]}"#,
        )
        .unwrap();
        assert_eq!(msg.text(), "one\ntwo");
    }

    #[test]
    fn test_message_text_prefers_flat_field() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"text":"flat","content":[{"type":"text","text":"block"}]}"#)
                .unwrap();
        assert_eq!(msg.text(), "flat");
    }
}
