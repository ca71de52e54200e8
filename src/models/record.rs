use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which field produced the current match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchSource {
    Title,
    Content,
    Both,
}

impl MatchSource {
    pub fn label(&self) -> &'static str {
        match self {
            MatchSource::Title => "title",
            MatchSource::Content => "content",
            MatchSource::Both => "title+content",
        }
    }
}

/// One conversation tracked by the manager.
///
/// Lowercase caches are private and recomputed by the setters, so they always mirror
/// the current title and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRecord {
    id: String,
    title: String,
    title_lowercase: String,
    pub updated_at: DateTime<Utc>,
    pub selected: bool,
    content: Option<String>,
    content_lowercase: Option<String>,
    content_indexed: bool,
    match_source: Option<MatchSource>,
    match_preview: String,
}

impl ConversationRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            title_lowercase: title.to_lowercase(),
            title,
            updated_at,
            selected: false,
            content: None,
            content_lowercase: None,
            content_indexed: false,
            match_source: None,
            match_preview: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn title_lowercase(&self) -> &str {
        &self.title_lowercase
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.title_lowercase = self.title.to_lowercase();
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn content_lowercase(&self) -> Option<&str> {
        self.content_lowercase.as_deref()
    }

    /// True only when content was fetched during this session (or restored from the
    /// content snapshot)
    pub fn content_indexed(&self) -> bool {
        self.content_indexed
    }

    /// Store fetched content. Empty content leaves the record unindexed.
    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        if content.is_empty() {
            return;
        }
        self.content_lowercase = Some(content.to_lowercase());
        self.content = Some(content);
        self.content_indexed = true;
    }

    pub fn match_source(&self) -> Option<MatchSource> {
        self.match_source
    }

    pub fn match_preview(&self) -> &str {
        &self.match_preview
    }

    pub(crate) fn set_match(&mut self, source: MatchSource, preview: String) {
        self.match_source = Some(source);
        self.match_preview = preview;
    }

    pub(crate) fn clear_match(&mut self) {
        self.match_source = None;
        self.match_preview.clear();
    }
}
