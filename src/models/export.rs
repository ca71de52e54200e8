use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::ConversationRecord;
use super::remote::{ChatMessage, ConversationDetail};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    Full,
    Metadata,
}

/// Top-level export file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub export_date: DateTime<Utc>,
    pub export_version: String,
    pub export_type: ExportType,
    pub total_conversations: usize,
    pub conversations: Vec<ExportEntry>,
}

impl ExportDocument {
    pub fn new(export_type: ExportType, conversations: Vec<ExportEntry>) -> Self {
        Self {
            export_date: Utc::now(),
            export_version: EXPORT_VERSION.to_string(),
            export_type,
            total_conversations: conversations.len(),
            conversations,
        }
    }
}

/// One conversation in an export. Failed items keep their place as `{id, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportEntry {
    Full(FullConversation),
    Metadata(MetadataConversation),
    Failed { id: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullConversation {
    pub id: String,
    pub name: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub model: Option<String>,
    pub chat_messages: Vec<ExportMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMessage {
    pub uuid: Option<String>,
    pub sender: Option<String>,
    pub text: String,
    pub created_at: Option<String>,
    pub attachments: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataConversation {
    pub id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

impl From<ConversationDetail> for FullConversation {
    fn from(detail: ConversationDetail) -> Self {
        Self {
            id: detail.uuid,
            name: detail.name.unwrap_or_default(),
            created_at: detail.created_at,
            updated_at: detail.updated_at,
            model: detail.model,
            chat_messages: detail.chat_messages.into_iter().map(ExportMessage::from).collect(),
        }
    }
}

impl From<ChatMessage> for ExportMessage {
    fn from(message: ChatMessage) -> Self {
        let text = message.text();
        Self {
            uuid: message.uuid,
            sender: message.sender,
            text,
            created_at: message.created_at,
            attachments: message.attachments,
        }
    }
}

impl From<&ConversationRecord> for MetadataConversation {
    fn from(record: &ConversationRecord) -> Self {
        Self {
            id: record.id().to_string(),
            name: record.title().to_string(),
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_entry_serializes_inline() {
        let doc = ExportDocument::new(
            ExportType::Full,
            vec![ExportEntry::Failed { id: "x".to_string(), error: "HTTP 500".to_string() }],
        );
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["export_type"], "full");
        assert_eq!(json["total_conversations"], 1);
        assert_eq!(json["conversations"][0], serde_json::json!({"id": "x", "error": "HTTP 500"}));
    }

    #[test]
    fn test_metadata_entry_shape() {
        let record = ConversationRecord::new("id-1", "Title", Utc::now());
        let doc = ExportDocument::new(
            ExportType::Metadata,
            vec![ExportEntry::Metadata(MetadataConversation::from(&record))],
        );
        let json = serde_json::to_value(&doc).unwrap();
        let entry = json["conversations"][0].as_object().unwrap();
        assert_eq!(entry.len(), 3);
        assert_eq!(entry["name"], "Title");
    }
}
