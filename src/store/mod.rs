//! In-memory record set and its filtered, sorted view.
//!
//! The store is mutated only by operation merge steps and by selection changes from
//! the UI. Filtering never touches core record fields, only the derived match fields.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::filters::apply::{FilterCriteria, apply_filters};
use crate::models::{ConversationRecord, ListingItem};

/// View ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    UpdatedNewest,
    UpdatedOldest,
    TitleAscending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub total: usize,
    pub visible: usize,
    pub selected: usize,
    pub indexed: usize,
}

/// Counts reported by [`RecordStore::merge_listing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
}

#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<ConversationRecord>,
    positions: HashMap<String, usize>,
    view: Vec<usize>,
    criteria: FilterCriteria,
    sort: SortOrder,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ConversationRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.insert(record);
        }
        store.refresh();
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ConversationRecord> {
        self.positions.get(id).map(|&idx| &self.records[idx])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ConversationRecord> {
        let idx = *self.positions.get(id)?;
        Some(&mut self.records[idx])
    }

    pub fn records(&self) -> impl Iterator<Item = &ConversationRecord> {
        self.records.iter()
    }

    /// Records passing the current filter, in view order
    pub fn visible(&self) -> impl Iterator<Item = &ConversationRecord> {
        self.view.iter().map(|&idx| &self.records[idx])
    }

    pub fn visible_count(&self) -> usize {
        self.view.len()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Replace the filter and rebuild the view
    pub fn apply_filter(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refresh();
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(FilterCriteria::default());
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
        self.sort_view();
    }

    /// Re-run the current filter and sort, e.g. after records changed
    pub fn refresh(&mut self) {
        self.view = apply_filters(&mut self.records, &self.criteria);
        self.sort_view();
    }

    fn sort_view(&mut self) {
        let records = &self.records;
        match self.sort {
            SortOrder::UpdatedNewest => {
                self.view.sort_by(|&a, &b| records[b].updated_at.cmp(&records[a].updated_at))
            }
            SortOrder::UpdatedOldest => {
                self.view.sort_by(|&a, &b| records[a].updated_at.cmp(&records[b].updated_at))
            }
            SortOrder::TitleAscending => self.view.sort_by(|&a, &b| {
                records[a].title_lowercase().cmp(records[b].title_lowercase())
            }),
        }
    }

    fn insert(&mut self, record: ConversationRecord) {
        if let Some(&idx) = self.positions.get(record.id()) {
            self.records[idx] = record;
        } else {
            self.positions.insert(record.id().to_string(), self.records.len());
            self.records.push(record);
        }
    }

    /// Merge listing results: new ids are added, known ids get title and timestamp
    /// refreshed while keeping selection and indexed content.
    pub fn merge_listing(&mut self, items: Vec<ListingItem>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for item in items {
            let title = item.name.unwrap_or_default();
            if let Some(existing) = self.get_mut(&item.uuid) {
                existing.set_title(title);
                existing.updated_at = item.updated_at;
                summary.updated += 1;
            } else {
                self.insert(ConversationRecord::new(item.uuid, title, item.updated_at));
                summary.added += 1;
            }
        }
        self.refresh();
        summary
    }

    /// Store fetched content by id. Returns how many records became indexed.
    pub fn merge_content<I>(&mut self, contents: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut indexed = 0;
        for (id, content) in contents {
            if content.is_empty() {
                continue;
            }
            if let Some(record) = self.get_mut(&id) {
                record.set_content(content);
                indexed += 1;
            }
        }
        self.refresh();
        indexed
    }

    /// Drop records by id, returning how many were removed
    pub fn remove_ids(&mut self, ids: &[String]) -> usize {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.records.len();
        self.records.retain(|r| !doomed.contains(r.id()));
        self.positions =
            self.records.iter().enumerate().map(|(i, r)| (r.id().to_string(), i)).collect();
        self.refresh();
        before - self.records.len()
    }

    pub fn set_selected(&mut self, id: &str, selected: bool) -> bool {
        match self.get_mut(id) {
            Some(record) => {
                record.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn toggle_selected(&mut self, id: &str) -> Option<bool> {
        self.get_mut(id).map(|record| {
            record.selected = !record.selected;
            record.selected
        })
    }

    pub fn select_all_visible(&mut self) {
        for &idx in &self.view {
            self.records[idx].selected = true;
        }
    }

    pub fn clear_selection(&mut self) {
        for record in &mut self.records {
            record.selected = false;
        }
    }

    /// Selected ids in view order, followed by selected records hidden by the filter
    pub fn selected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> =
            self.visible().filter(|r| r.selected).map(|r| r.id().to_string()).collect();
        let seen: HashSet<String> = ids.iter().cloned().collect();
        ids.extend(
            self.records
                .iter()
                .filter(|r| r.selected && !seen.contains(r.id()))
                .map(|r| r.id().to_string()),
        );
        ids
    }

    /// Ids whose content has not been fetched yet, newest first
    pub fn unindexed_ids(&self) -> Vec<String> {
        let mut pending: Vec<&ConversationRecord> =
            self.records.iter().filter(|r| !r.content_indexed()).collect();
        pending.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        pending.into_iter().map(|r| r.id().to_string()).collect()
    }

    pub fn newest_update(&self) -> Option<DateTime<Utc>> {
        self.records.iter().map(|r| r.updated_at).max()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total: self.records.len(),
            visible: self.view.len(),
            selected: self.records.iter().filter(|r| r.selected).count(),
            indexed: self.records.iter().filter(|r| r.content_indexed()).count(),
        }
    }
}
