//! Snapshot structures written to the cache directory

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ConversationRecord;

/// Snapshot schema version for invalidation on format changes
pub const SNAPSHOT_VERSION: u32 = 1;

/// Listing metadata for every known record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub records: Vec<CachedRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

/// Fetched conversation content, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub version: u32,
    pub entries: Vec<ContentEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub id: String,
    pub updated_at: DateTime<Utc>,
    pub content: String,
}

impl MetadataSnapshot {
    pub fn new<'a>(records: impl IntoIterator<Item = &'a ConversationRecord>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            records: records
                .into_iter()
                .map(|r| CachedRecord {
                    id: r.id().to_string(),
                    title: r.title().to_string(),
                    updated_at: r.updated_at,
                })
                .collect(),
        }
    }

    /// Older than `max_age_hours` at `now`. A snapshot from the future counts as fresh.
    pub fn is_expired(&self, max_age_hours: i64, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.saved_at) > Duration::hours(max_age_hours)
    }

    pub fn into_records(self) -> Vec<ConversationRecord> {
        self.records
            .into_iter()
            .map(|r| ConversationRecord::new(r.id, r.title, r.updated_at))
            .collect()
    }
}

impl ContentSnapshot {
    /// Indexed records only, keeping the `cap` most recently updated
    pub fn new<'a>(records: impl IntoIterator<Item = &'a ConversationRecord>, cap: usize) -> Self {
        let mut entries: Vec<ContentEntry> = records
            .into_iter()
            .filter_map(|r| {
                r.content().map(|content| ContentEntry {
                    id: r.id().to_string(),
                    updated_at: r.updated_at,
                    content: content.to_string(),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        entries.truncate(cap);
        Self { version: SNAPSHOT_VERSION, entries }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(id: &str, day: u32, content: Option<&str>) -> ConversationRecord {
        let mut r = ConversationRecord::new(id, id.to_uppercase(), Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap());
        if let Some(c) = content {
            r.set_content(c);
        }
        r
    }

    #[test]
    fn test_metadata_expiry() {
        let mut snapshot = MetadataSnapshot::new(&[record("a", 1, None)]);
        let now = snapshot.saved_at;
        assert!(!snapshot.is_expired(24, now + Duration::hours(23)));
        assert!(snapshot.is_expired(24, now + Duration::hours(25)));

        snapshot.saved_at = now + Duration::hours(5);
        assert!(!snapshot.is_expired(24, now));
    }

    #[test]
    fn test_content_snapshot_keeps_newest_indexed() {
        let records = [
            record("old", 1, Some("old text")),
            record("new", 9, Some("new text")),
            record("mid", 5, Some("mid text")),
            record("bare", 20, None),
        ];
        let snapshot = ContentSnapshot::new(&records, 2);
        let ids: Vec<&str> = snapshot.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid"]);
    }

    #[test]
    fn test_metadata_round_trips_into_records() {
        let snapshot = MetadataSnapshot::new(&[record("a", 2, Some("ignored"))]);
        let records = snapshot.into_records();
        assert_eq!(records[0].title(), "A");
        assert!(!records[0].content_indexed());
    }
}
