//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chat_history_manager::config::CacheConfig;
use chat_history_manager::error::BrowserError;
use chat_history_manager::index_storage::CacheStore;
use chat_history_manager::models::ConversationRecord;
use chat_history_manager::operations::script::POLL_EXPRESSION;
use chat_history_manager::operations::{BrowserSession, DriverSettings, SessionLauncher};
use chat_history_manager::store::RecordStore;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;
use url::Url;

pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Builder for conversation records
pub struct RecordBuilder {
    id: String,
    title: String,
    updated_at: DateTime<Utc>,
    content: Option<String>,
    selected: bool,
}

impl RecordBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: format!("Conversation {}", id),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
            content: None,
            selected: false,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Updated at noon UTC on the given date
    pub fn updated(mut self, year: i32, month: u32, day: u32) -> Self {
        self.updated_at = Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap();
        self
    }

    pub fn content(mut self, content: &str) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    pub fn build(self) -> ConversationRecord {
        let mut record = ConversationRecord::new(self.id, self.title, self.updated_at);
        if let Some(content) = self.content {
            record.set_content(content);
        }
        record.selected = self.selected;
        record
    }
}

pub fn store_of(records: Vec<RecordBuilder>) -> RecordStore {
    RecordStore::from_records(records.into_iter().map(RecordBuilder::build).collect())
}

/// Temp cache directory holding snapshots of the given records
pub fn cache_dir_with(records: Vec<RecordBuilder>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    CacheStore::new(temp_dir.path())
        .save_from(&store_of(records), &CacheConfig::default())
        .expect("Failed to write snapshots");
    temp_dir
}

/// What the fake browser saw and will answer
#[derive(Default)]
pub struct FakeState {
    pub urls: VecDeque<String>,
    pub org: Option<String>,
    pub polls: VecDeque<Value>,
    pub injected: Vec<String>,
    pub launches: usize,
    pub closed: usize,
    pub fail_launch: bool,
    pub fail_navigation: bool,
    /// Polls answered with an evaluation error before the queue is consulted
    pub poll_errors: usize,
    /// The page goes away after this many poll evaluations
    pub close_after_polls: Option<usize>,
    pub polls_seen: usize,
}

/// Scripted embedded browser: answers polls from a queue, then "still running"
#[derive(Clone)]
pub struct FakeBrowser {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        let state = FakeState {
            urls: VecDeque::from(vec!["https://chat.test/recents".to_string()]),
            org: Some("org-123".to_string()),
            ..Default::default()
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    pub fn with_polls(self, polls: Vec<Value>) -> Self {
        self.state.lock().unwrap().polls = polls.into();
        self
    }

    pub fn without_org(self) -> Self {
        self.state.lock().unwrap().org = None;
        self
    }

    pub fn failing_launch(self) -> Self {
        self.state.lock().unwrap().fail_launch = true;
        self
    }

    pub fn failing_navigation(self) -> Self {
        self.state.lock().unwrap().fail_navigation = true;
        self
    }

    /// Answer the first `count` polls with an evaluation error
    pub fn with_poll_errors(self, count: usize) -> Self {
        self.state.lock().unwrap().poll_errors = count;
        self
    }

    /// Report the session closed once `polls` polls have been answered
    pub fn closing_after(self, polls: usize) -> Self {
        self.state.lock().unwrap().close_after_polls = Some(polls);
        self
    }

    pub fn polls_seen(&self) -> usize {
        self.state.lock().unwrap().polls_seen
    }

    /// Show the login page for `polls` URL checks before landing on the ready page
    pub fn with_login(self, polls: usize) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for _ in 0..polls {
                state.urls.push_front("https://chat.test/login".to_string());
            }
        }
        self
    }

    pub fn launcher(&self) -> Arc<dyn SessionLauncher> {
        Arc::new(self.clone())
    }

    pub fn injected(&self) -> Vec<String> {
        self.state.lock().unwrap().injected.clone()
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    pub fn launches(&self) -> usize {
        self.state.lock().unwrap().launches
    }
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionLauncher for FakeBrowser {
    async fn launch(&self, _profile_dir: &Path) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.launches += 1;
        if state.fail_launch {
            return Err(BrowserError::Launch("no display available".to_string()));
        }
        Ok(Box::new(FakeSession { state: self.state.clone(), closed: false }))
    }
}

struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    closed: bool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &Url) -> Result<(), BrowserError> {
        if self.state.lock().unwrap().fail_navigation {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        Ok(())
    }

    async fn current_url(&mut self) -> Result<Url, BrowserError> {
        let mut state = self.state.lock().unwrap();
        let url = if state.urls.len() > 1 {
            state.urls.pop_front().unwrap_or_default()
        } else {
            state.urls.front().cloned().unwrap_or_default()
        };
        Url::parse(&url).map_err(|e| BrowserError::Evaluation(e.to_string()))
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, BrowserError> {
        if self.closed {
            return Err(BrowserError::SessionClosed);
        }
        let mut state = self.state.lock().unwrap();
        if script == POLL_EXPRESSION {
            if state.close_after_polls.is_some_and(|limit| state.polls_seen >= limit) {
                return Err(BrowserError::SessionClosed);
            }
            state.polls_seen += 1;
            if state.poll_errors > 0 {
                state.poll_errors -= 1;
                return Err(BrowserError::Evaluation("execution context was destroyed".to_string()));
            }
            return Ok(state.polls.pop_front().unwrap_or_else(|| json!({"progress": 0, "done": false})));
        }
        state.injected.push(script.to_string());
        Ok(Value::Bool(true))
    }

    async fn cookie(&mut self, name: &str) -> Result<Option<String>, BrowserError> {
        let state = self.state.lock().unwrap();
        Ok(if name == "lastActiveOrg" { state.org.clone() } else { None })
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.lock().unwrap().closed += 1;
        }
    }
}

pub fn driver_settings() -> DriverSettings {
    DriverSettings {
        profile_dir: PathBuf::from("/tmp/chm-test-profile"),
        entry_url: Url::parse("https://chat.test/recents").unwrap(),
        ready_path_prefix: "/recents".to_string(),
        api_base: "https://chat.test/api".to_string(),
        org_cookie: "lastActiveOrg".to_string(),
        poll_interval: POLL_INTERVAL,
        settle_delay: SETTLE_DELAY,
    }
}

/// Poll state for a script still running at `progress`
pub fn running(progress: u64) -> Value {
    json!({"progress": progress, "done": false, "result": null})
}

/// Poll state for a script that finished successfully with `data`
pub fn finished(progress: u64, data: Value) -> Value {
    json!({"progress": progress, "done": true, "result": {"success": true, "error": null, "data": data}})
}

/// Poll state for a script that finished with an error
pub fn failed(progress: u64, error: &str) -> Value {
    json!({"progress": progress, "done": true, "result": {"success": false, "error": error, "data": null}})
}
