//! Data models for the conversation manager.
//!
//! - [`ConversationRecord`] - One conversation held in the in-memory store
//! - [`ListingItem`] / [`ConversationDetail`] - Wire shapes returned by the remote service
//! - [`ExportDocument`] - The JSON export file
//!
//! Remote timestamps go through the lenient deserializers in `parsers::deserializers`.

pub mod export;
pub mod record;
pub mod remote;

pub use export::{
    ExportDocument, ExportEntry, ExportMessage, ExportType, FullConversation, MetadataConversation,
};
pub use record::{ConversationRecord, MatchSource};
pub use remote::{ChatMessage, ConversationDetail, ListingItem};
