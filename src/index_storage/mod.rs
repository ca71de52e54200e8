//! Record snapshots persisted between runs
//!
//! Two JSON files, both written atomically (temp file + rename):
//! - `conversations.json`: listing metadata for every record, expires after
//!   `cache.metadata_max_age_hours`
//! - `content-index.json`: fetched content for the most recently updated records,
//!   capped at `cache.content_index_cap`
//!
//! Cache location: platform-specific cache directories
//! - macOS: `~/Library/Caches/chat-history-manager/`
//! - Linux: `~/.cache/chat-history-manager/`
//! - Windows: `%LOCALAPPDATA%\chat-history-manager\`

pub mod metadata;
pub mod persistence;

pub use metadata::{CachedRecord, ContentEntry, ContentSnapshot, MetadataSnapshot, SNAPSHOT_VERSION};
pub use persistence::{CacheStore, RestoreSummary, snapshot_from};
