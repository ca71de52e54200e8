//! Snapshot persistence: load/save with atomic writes

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;

use super::metadata::{ContentSnapshot, MetadataSnapshot, SNAPSHOT_VERSION};
use crate::config::CacheConfig;
use crate::store::RecordStore;
use crate::utils::{app_cache_dir, write_json_atomic};

const METADATA_FILENAME: &str = "conversations.json";
const CONTENT_FILENAME: &str = "content-index.json";

/// What [`CacheStore::restore_into`] put back into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreSummary {
    pub records: usize,
    pub indexed: usize,
}

/// Snapshot files under one cache directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform cache directory (`~/.cache/chat-history-manager` on Linux)
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(app_cache_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILENAME)
    }

    pub fn content_path(&self) -> PathBuf {
        self.dir.join(CONTENT_FILENAME)
    }

    /// Returns None if the snapshot is missing, corrupted, from another version or
    /// expired (caller should fetch again)
    pub fn load_metadata(&self, max_age_hours: i64) -> Result<Option<MetadataSnapshot>> {
        let Some(snapshot) = read_snapshot::<MetadataSnapshot>(&self.metadata_path())? else {
            return Ok(None);
        };
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(expected = SNAPSHOT_VERSION, found = snapshot.version, "Metadata snapshot version mismatch");
            return Ok(None);
        }
        if snapshot.is_expired(max_age_hours, Utc::now()) {
            tracing::info!(saved_at = %snapshot.saved_at, "Metadata snapshot expired");
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    pub fn load_content(&self) -> Result<Option<ContentSnapshot>> {
        let Some(snapshot) = read_snapshot::<ContentSnapshot>(&self.content_path())? else {
            return Ok(None);
        };
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(expected = SNAPSHOT_VERSION, found = snapshot.version, "Content snapshot version mismatch");
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    pub fn save_metadata(&self, snapshot: &MetadataSnapshot) -> Result<()> {
        write_json_atomic(&self.metadata_path(), snapshot)
            .context("Failed to write metadata snapshot")
    }

    pub fn save_content(&self, snapshot: &ContentSnapshot) -> Result<()> {
        write_json_atomic(&self.content_path(), snapshot).context("Failed to write content snapshot")
    }

    /// Load both snapshots into `store`. Content for ids absent from the metadata is
    /// dropped.
    pub fn restore_into(&self, store: &mut RecordStore, config: &CacheConfig) -> Result<RestoreSummary> {
        let Some(metadata) = self.load_metadata(config.metadata_max_age_hours)? else {
            return Ok(RestoreSummary::default());
        };
        *store = RecordStore::from_records(metadata.into_records());

        let indexed = match self.load_content()? {
            Some(content) => store.merge_content(content.entries.into_iter().map(|e| (e.id, e.content))),
            None => 0,
        };

        let summary = RestoreSummary { records: store.len(), indexed };
        tracing::info!(records = summary.records, indexed = summary.indexed, dir = %self.dir.display(), "Cache restored");
        Ok(summary)
    }

    /// Write both snapshots from the current store contents
    pub fn save_from(&self, store: &RecordStore, config: &CacheConfig) -> Result<()> {
        let (metadata, content) = snapshot_from(store, config);
        self.save_metadata(&metadata)?;
        self.save_content(&content)?;
        tracing::info!(
            records = metadata.records.len(),
            indexed = content.entries.len(),
            dir = %self.dir.display(),
            "Cache saved"
        );
        Ok(())
    }
}

/// Both snapshots for the current store contents
pub fn snapshot_from(store: &RecordStore, config: &CacheConfig) -> (MetadataSnapshot, ContentSnapshot) {
    (
        MetadataSnapshot::new(store.records()),
        ContentSnapshot::new(store.records(), config.content_index_cap),
    )
}

/// Missing and unparseable files are both `Ok(None)`; only read errors propagate
fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    match serde_json::from_str(&text) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt snapshot");
            Ok(None)
        }
    }
}
