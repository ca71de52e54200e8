//! Chat History Manager - bulk search, export and delete for browser-authenticated
//! conversation history
//!
//! The conversation service has no API key; the only credentials are the cookies of a
//! logged-in browser profile. This library provides:
//!
//! - A small query language (`a | b`, `/regex/`, `id:...`, `not:term`) with date bounds
//!   for filtering thousands of records in memory
//! - [`RecordStore`], the filtered, sorted and selectable record set
//! - An [`OperationDriver`] that runs fetch, index, export and delete tasks by injecting
//!   script into an embedded browser and polling it for progress
//! - JSON snapshots of the record set between runs
//!
//! # Example
//!
//! ```
//! use chat_history_manager::{ConversationRecord, FilterCriteria, RecordStore, parse_query};
//! use chrono::Utc;
//!
//! let mut store = RecordStore::from_records(vec![
//!     ConversationRecord::new("1", "Rust lifetimes", Utc::now()),
//!     ConversationRecord::new("2", "Python debugging", Utc::now()),
//! ]);
//! store.apply_filter(FilterCriteria::new(parse_query("rust | go")));
//! assert_eq!(store.visible_count(), 1);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod filters;
pub mod index_storage;
pub mod models;
pub mod operations;
pub mod parsers;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{BrowserError, OperationError};
pub use filters::{FilterCriteria, Query, QueryMode, parse_query};
pub use models::{ConversationRecord, MatchSource};
pub use operations::{OperationDriver, OperationHandle, OperationStatus};
pub use store::{RecordStore, SortOrder};
