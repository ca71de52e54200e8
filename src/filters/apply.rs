use chrono::{DateTime, Days, NaiveDate, Utc};

use super::ast::{Query, QueryMode};
use super::matcher::{DEFAULT_CONTEXT_CHARS, is_excluded, matches, matches_id, snippet};
use crate::models::record::{ConversationRecord, MatchSource};

const PREVIEW_SEPARATOR: &str = " | ";

/// Everything the store needs to decide which records are visible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub query: Query,
    /// Inclusive lower bound on `updated_at`
    pub after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `updated_at`
    pub before: Option<DateTime<Utc>>,
    /// Also search indexed content
    pub search_content: bool,
    pub context_chars: usize,
}

impl FilterCriteria {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            after: None,
            before: None,
            search_content: false,
            context_chars: DEFAULT_CONTEXT_CHARS,
        }
    }

    /// Records updated on or after the start of `date`
    pub fn after_date(mut self, date: NaiveDate) -> Self {
        self.after = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        self
    }

    /// Records updated on or before the end of `date`
    pub fn before_date(mut self, date: NaiveDate) -> Self {
        self.before = date
            .checked_add_days(Days::new(1))
            .and_then(|next| next.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc() - chrono::Duration::nanoseconds(1));
        self
    }

    pub fn with_content(mut self, search_content: bool) -> Self {
        self.search_content = search_content;
        self
    }

    /// True when nothing would be filtered out
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.after.is_none() && self.before.is_none()
    }
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self::new(Query::none())
    }
}

/// Outcome for a record that passed the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMatch {
    pub source: Option<MatchSource>,
    pub preview: String,
}

/// Parse a YYYY-MM-DD date bound
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    // Enforce strict YYYY-MM-DD format (10 chars)
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Filter records in place, returning the indices that remain visible.
///
/// Match provenance and previews are written back onto each record; records that do
/// not match, or every record when the query is empty, get them cleared.
pub fn apply_filters(records: &mut [ConversationRecord], criteria: &FilterCriteria) -> Vec<usize> {
    let mut visible = Vec::with_capacity(records.len());
    for (idx, record) in records.iter_mut().enumerate() {
        match evaluate_record(record, criteria) {
            Some(RecordMatch { source: Some(source), preview }) => {
                record.set_match(source, preview);
                visible.push(idx);
            }
            Some(RecordMatch { source: None, .. }) => {
                record.clear_match();
                visible.push(idx);
            }
            None => record.clear_match(),
        }
    }
    visible
}

/// Evaluate one record: date bounds first, then the text query
pub fn evaluate_record(record: &ConversationRecord, criteria: &FilterCriteria) -> Option<RecordMatch> {
    if !within_bounds(record.updated_at, criteria) {
        return None;
    }

    let query = &criteria.query;
    let content = if criteria.search_content && record.content_indexed() {
        record.content().zip(record.content_lowercase())
    } else {
        None
    };

    match &query.mode {
        QueryMode::Id(_) => {
            let excluded = is_excluded(record.title_lowercase(), query)
                || content.is_some_and(|(_, lower)| is_excluded(lower, query));
            (matches_id(record.id(), query) && !excluded)
                .then(|| RecordMatch { source: None, preview: String::new() })
        }
        QueryMode::None | QueryMode::All => {
            let title_ok = matches(record.title(), record.title_lowercase(), query);
            let content_ok = content.is_some_and(|(text, lower)| matches(text, lower, query));
            (title_ok || content_ok).then(|| RecordMatch { source: None, preview: String::new() })
        }
        QueryMode::Contains(_) | QueryMode::Or(_) | QueryMode::Regex(_) => {
            let title_hit = matches(record.title(), record.title_lowercase(), query);
            let content_hit = content.is_some_and(|(text, lower)| matches(text, lower, query));

            let source = match (title_hit, content_hit) {
                (true, true) => MatchSource::Both,
                (true, false) => MatchSource::Title,
                (false, true) => MatchSource::Content,
                (false, false) => return None,
            };

            let mut parts = Vec::with_capacity(2);
            if title_hit {
                parts.push(snippet(record.title(), query, criteria.context_chars));
            }
            if let Some((text, _)) = content.filter(|_| content_hit) {
                parts.push(snippet(text, query, criteria.context_chars));
            }
            parts.retain(|p| !p.is_empty());

            Some(RecordMatch { source: Some(source), preview: parts.join(PREVIEW_SEPARATOR) })
        }
    }
}

fn within_bounds(updated_at: DateTime<Utc>, criteria: &FilterCriteria) -> bool {
    if criteria.after.is_some_and(|after| updated_at < after) {
        return false;
    }
    if criteria.before.is_some_and(|before| updated_at > before) {
        return false;
    }
    true
}
