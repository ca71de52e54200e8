//! Fetch the full conversation listing.
//!
//! The page walks the cursor-paginated listing and hands every page back. The same
//! stopping rules then run again here in [`PageWalk`], so a misbehaving page script or
//! server can never grow the store past what the rules allow.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::driver::{ReadyContext, Task};
use super::script::{ScriptConfig, ScriptResult, build_script};
use super::state::{OperationHandle, ProgressMode};
use crate::config::OperationsConfig;
use crate::error::OperationError;
use crate::models::ListingItem;
use crate::store::{MergeSummary, RecordStore};

const BODY: &str = r#"
        const seen = new Set();
        const cursors = new Set();
        const pages = [];
        let cursor = null;
        let firstSize = null;
        while (pages.length < CONFIG.pageCeiling) {
          const query = cursor ? '?cursor=' + encodeURIComponent(cursor) : '';
          const body = await api('GET', '/chat_conversations' + query);
          const raw = Array.isArray(body) ? body : ((body && (body.data || body.conversations)) || []);
          const items = raw
            .filter((c) => c && c.uuid)
            .map((c) => ({ uuid: c.uuid, name: c.name || null, updated_at: c.updated_at || null }));
          let next = Array.isArray(body) ? null : ((body && (body.next_cursor || body.cursor)) || null);
          if (!next && items.length > 0) next = items[items.length - 1].uuid;
          pages.push({ cursor, next_cursor: next, items });

          const novel = items.filter((c) => !seen.has(c.uuid));
          novel.forEach((c) => seen.add(c.uuid));
          tick(novel.length);
          if (novel.length === 0) break;
          if (firstSize === null) firstSize = items.length;
          else if (items.length < firstSize) break;
          if (!next || cursors.has(next) || next === cursor) break;
          cursors.add(next);
          cursor = next;
        }
        return { pages };
"#;

/// One listing page as reported by the page script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingPage {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub items: Vec<ListingItem>,
}

#[derive(Debug, Deserialize)]
struct FetchPayload {
    #[serde(default)]
    pages: Vec<ListingPage>,
}

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page contained only ids already seen
    NoNovelIds,
    /// A page was shorter than the first one
    ShortPage,
    /// The next cursor was already visited
    RepeatedCursor,
    /// No next cursor
    EndOfListing,
    PageCeiling,
}

/// Cursor pagination with the stopping rules applied to each page in order
#[derive(Debug)]
pub struct PageWalk {
    ceiling: usize,
    pages: usize,
    first_len: Option<usize>,
    seen: HashSet<String>,
    cursors: HashSet<String>,
    items: Vec<ListingItem>,
    stop: Option<StopReason>,
}

impl PageWalk {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            pages: 0,
            first_len: None,
            seen: HashSet::new(),
            cursors: HashSet::new(),
            items: Vec::new(),
            stop: None,
        }
    }

    /// Feed the next page. Returns `Some` once pagination must stop; pages fed after
    /// that are ignored.
    pub fn accept(&mut self, page: ListingPage) -> Option<StopReason> {
        if self.stop.is_some() {
            return self.stop;
        }
        if self.pages >= self.ceiling {
            return self.halt(StopReason::PageCeiling);
        }
        self.pages += 1;

        let page_len = page.items.len();
        let before = self.items.len();
        for item in page.items {
            if self.seen.insert(item.uuid.clone()) {
                self.items.push(item);
            }
        }
        if self.items.len() == before {
            return self.halt(StopReason::NoNovelIds);
        }

        match self.first_len {
            None => self.first_len = Some(page_len),
            Some(first) if page_len < first => return self.halt(StopReason::ShortPage),
            Some(_) => {}
        }

        let Some(next) = page.next_cursor else {
            return self.halt(StopReason::EndOfListing);
        };
        if page.cursor.as_deref() == Some(next.as_str()) || !self.cursors.insert(next) {
            return self.halt(StopReason::RepeatedCursor);
        }

        if self.pages >= self.ceiling {
            return self.halt(StopReason::PageCeiling);
        }
        None
    }

    fn halt(&mut self, reason: StopReason) -> Option<StopReason> {
        self.stop = Some(reason);
        self.stop
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// Distinct items in first-seen order
    pub fn into_items(self) -> Vec<ListingItem> {
        self.items
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub pages: usize,
    pub distinct: usize,
    pub merge: MergeSummary,
    pub stop: StopReason,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchParams {
    page_ceiling: usize,
}

pub struct FetchTask {
    page_ceiling: usize,
    timeout: Duration,
}

impl FetchTask {
    pub fn new(config: &OperationsConfig) -> Self {
        Self {
            page_ceiling: config.page_ceiling.max(1),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }
}

impl Task for FetchTask {
    type Output = FetchSummary;

    fn title(&self) -> String {
        "Fetching conversations".to_string()
    }

    fn initial_status(&self) -> String {
        "Loading conversation list".to_string()
    }

    fn progress_mode(&self) -> ProgressMode {
        ProgressMode::Counter
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn on_ready(
        &mut self,
        _handle: &OperationHandle,
        ctx: &ReadyContext,
    ) -> Result<String, OperationError> {
        let config = ScriptConfig {
            api_base: ctx.api_base.clone(),
            org_id: ctx.org_id.clone(),
            params: FetchParams { page_ceiling: self.page_ceiling },
        };
        Ok(build_script(&config, BODY)?)
    }

    fn merge(
        &mut self,
        result: ScriptResult,
        store: &mut RecordStore,
    ) -> Result<FetchSummary, OperationError> {
        let payload: FetchPayload = result.into_data()?;

        let mut walk = PageWalk::new(self.page_ceiling);
        for page in payload.pages {
            if walk.accept(page).is_some() {
                break;
            }
        }
        let pages = walk.pages();
        // Pages ran out without tripping a rule: nothing came back, or the page hit its
        // own ceiling
        let stop = walk.stop_reason().unwrap_or(if pages == 0 {
            StopReason::EndOfListing
        } else {
            StopReason::PageCeiling
        });
        let items = walk.into_items();
        let distinct = items.len();
        let merge = store.merge_listing(items);

        tracing::info!(pages, distinct, added = merge.added, updated = merge.updated, ?stop, "Listing fetched");
        Ok(FetchSummary { pages, distinct, merge, stop })
    }

    fn progress_text(&self, progress: u64, _total: Option<u64>) -> String {
        format!("Fetched {} conversations", progress)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn item(id: &str) -> ListingItem {
        ListingItem { uuid: id.to_string(), name: Some(format!("Title {}", id)), updated_at: Utc::now() }
    }

    fn page(cursor: Option<&str>, next: Option<&str>, ids: &[&str]) -> ListingPage {
        ListingPage {
            cursor: cursor.map(str::to_string),
            next_cursor: next.map(str::to_string),
            items: ids.iter().map(|id| item(id)).collect(),
        }
    }

    #[test]
    fn test_walk_ends_without_cursor() {
        let mut walk = PageWalk::new(10);
        assert_eq!(walk.accept(page(None, Some("c1"), &["a", "b"])), None);
        assert_eq!(walk.accept(page(Some("c1"), None, &["c", "d"])), Some(StopReason::EndOfListing));
        assert_eq!(walk.pages(), 2);
        assert_eq!(walk.into_items().len(), 4);
    }

    #[test]
    fn test_walk_dedups_and_stops_on_no_novel_ids() {
        let mut walk = PageWalk::new(10);
        assert_eq!(walk.accept(page(None, Some("c1"), &["a", "b", "c"])), None);
        assert_eq!(walk.accept(page(Some("c1"), Some("c2"), &["b", "c", "d"])), None);
        assert_eq!(
            walk.accept(page(Some("c2"), Some("c3"), &["a", "b", "d"])),
            Some(StopReason::NoNovelIds)
        );
        let ids: Vec<String> = walk.into_items().into_iter().map(|i| i.uuid).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_walk_stops_on_repeated_cursor() {
        let mut walk = PageWalk::new(10);
        walk.accept(page(None, Some("c1"), &["a"]));
        walk.accept(page(Some("c1"), Some("c2"), &["b"]));
        assert_eq!(walk.accept(page(Some("c2"), Some("c1"), &["c"])), Some(StopReason::RepeatedCursor));
        assert_eq!(walk.into_items().len(), 3);
    }

    #[test]
    fn test_walk_stops_on_short_page() {
        let mut walk = PageWalk::new(10);
        walk.accept(page(None, Some("c1"), &["a", "b", "c"]));
        assert_eq!(walk.accept(page(Some("c1"), Some("c2"), &["d"])), Some(StopReason::ShortPage));
        // Later pages are ignored
        assert_eq!(walk.accept(page(Some("c2"), None, &["e", "f", "g"])), Some(StopReason::ShortPage));
        assert_eq!(walk.into_items().len(), 4);
    }

    #[test]
    fn test_walk_respects_ceiling() {
        let mut walk = PageWalk::new(3);
        let mut stop = None;
        for n in 0..10 {
            let cursor = format!("c{}", n);
            let next = format!("c{}", n + 1);
            let id = format!("id{}", n);
            stop = walk.accept(page(Some(cursor.as_str()), Some(next.as_str()), &[id.as_str()]));
            if stop.is_some() {
                break;
            }
        }
        assert_eq!(stop, Some(StopReason::PageCeiling));
        assert_eq!(walk.pages(), 3);
    }

    #[test]
    fn test_walk_empty_first_page() {
        let mut walk = PageWalk::new(10);
        assert_eq!(walk.accept(page(None, None, &[])), Some(StopReason::NoNovelIds));
        assert!(walk.into_items().is_empty());
    }

    #[test]
    fn test_merge_applies_walk_to_store() {
        let mut task = FetchTask::new(&OperationsConfig::default());
        let mut store = RecordStore::new();
        let result: ScriptResult = serde_json::from_value(json!({
            "success": true,
            "data": {"pages": [
                {"cursor": null, "next_cursor": "x", "items": [
                    {"uuid": "a", "name": "A", "updated_at": "2025-01-01T00:00:00Z"},
                    {"uuid": "b", "name": null, "updated_at": 1735689600000_i64}
                ]},
                {"cursor": "x", "next_cursor": "x", "items": [
                    {"uuid": "b", "name": "B"},
                    {"uuid": "c", "name": "C", "updated_at": "garbage"}
                ]}
            ]}
        }))
        .unwrap();

        let summary = task.merge(result, &mut store).unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.distinct, 3);
        assert_eq!(summary.merge.added, 3);
        assert_eq!(summary.stop, StopReason::RepeatedCursor);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get("b").unwrap().title(), "");
    }

    #[test]
    fn test_merge_auth_expired_leaves_store_untouched() {
        let mut task = FetchTask::new(&OperationsConfig::default());
        let mut store = RecordStore::new();
        let result: ScriptResult =
            serde_json::from_value(json!({"success": false, "error": "auth_expired"})).unwrap();
        assert!(matches!(task.merge(result, &mut store), Err(OperationError::AuthExpired)));
        assert!(store.is_empty());
    }
}
