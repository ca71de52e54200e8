//! Fetch conversation bodies so content search has something to match.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::driver::{ReadyContext, Task};
use super::script::{ScriptConfig, ScriptResult, build_script};
use super::state::{OperationHandle, ProgressMode};
use crate::config::OperationsConfig;
use crate::error::OperationError;
use crate::store::RecordStore;

// Batches run concurrently; the delay sits between batches only. A failed item
// yields empty content and never aborts the batch.
const BODY: &str = r#"
        const messageText = (m) => {
          if (m && m.text) return m.text;
          return ((m && m.content) || [])
            .filter((b) => b && (!b.type || b.type === 'text') && b.text)
            .map((b) => b.text)
            .join('\n');
        };
        const items = [];
        for (let i = 0; i < CONFIG.ids.length; i += CONFIG.batchSize) {
          if (i > 0) await sleep(CONFIG.batchDelayMs);
          const batch = CONFIG.ids.slice(i, i + CONFIG.batchSize);
          const results = await Promise.all(batch.map(async (id) => {
            try {
              const detail = await api('GET', '/chat_conversations/' + encodeURIComponent(id) + '?tree=true');
              const text = ((detail && detail.chat_messages) || []).map(messageText).filter(Boolean).join('\n');
              return { id, content: text.slice(0, CONFIG.maxContentChars) };
            } catch (e) {
              return { id, content: '', error: String((e && e.message) || e) };
            } finally {
              tick();
            }
          }));
          items.push(...results);
        }
        return { items };
"#;

#[derive(Debug, Deserialize)]
struct IndexPayload {
    #[serde(default)]
    items: Vec<IndexedItem>,
}

#[derive(Debug, Deserialize)]
struct IndexedItem {
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexSummary {
    pub requested: usize,
    pub indexed: usize,
    pub empty: usize,
    pub failed: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexParams<'a> {
    ids: &'a [String],
    batch_size: usize,
    batch_delay_ms: u64,
    max_content_chars: usize,
}

pub struct IndexTask {
    ids: Vec<String>,
    batch_size: usize,
    batch_delay_ms: u64,
    max_content_chars: usize,
    timeout: Duration,
}

impl IndexTask {
    pub fn new(ids: Vec<String>, config: &OperationsConfig) -> Self {
        Self {
            ids,
            batch_size: config.index_batch_size.max(1),
            batch_delay_ms: config.index_batch_delay_ms,
            max_content_chars: config.max_content_chars,
            timeout: Duration::from_secs(config.index_timeout_secs),
        }
    }

    /// Index everything the store has not indexed yet, newest first
    pub fn pending(store: &RecordStore, config: &OperationsConfig) -> Self {
        Self::new(store.unindexed_ids(), config)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl Task for IndexTask {
    type Output = IndexSummary;

    fn title(&self) -> String {
        "Indexing conversation content".to_string()
    }

    fn initial_status(&self) -> String {
        format!("Indexing {} conversations", self.ids.len())
    }

    fn progress_mode(&self) -> ProgressMode {
        ProgressMode::Determinate
    }

    fn total(&self) -> Option<u64> {
        Some(self.ids.len() as u64)
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
            params: IndexParams {
                ids: &self.ids,
                batch_size: self.batch_size,
                batch_delay_ms: self.batch_delay_ms,
                max_content_chars: self.max_content_chars,
            },
        };
        Ok(build_script(&config, BODY)?)
    }

    fn merge(
        &mut self,
        result: ScriptResult,
        store: &mut RecordStore,
    ) -> Result<IndexSummary, OperationError> {
        let payload: IndexPayload = result.into_data()?;
        let mut summary = IndexSummary { requested: self.ids.len(), ..Default::default() };

        let mut contents = Vec::with_capacity(payload.items.len());
        for item in payload.items {
            if let Some(error) = &item.error {
                tracing::debug!(id = %item.id, error = %error, "Content fetch failed");
                summary.failed += 1;
                continue;
            }
            if item.content.is_empty() {
                summary.empty += 1;
                continue;
            }
            contents.push((item.id, truncate_chars(item.content, self.max_content_chars)));
        }

        summary.indexed = store.merge_content(contents);
        tracing::info!(
            requested = summary.requested,
            indexed = summary.indexed,
            empty = summary.empty,
            failed = summary.failed,
            "Content indexed"
        );
        Ok(summary)
    }

    fn progress_text(&self, progress: u64, total: Option<u64>) -> String {
        format!("Indexed {} of {}", progress, total.unwrap_or(self.ids.len() as u64))
    }
}

/// Keep at most `max` characters, cutting on a char boundary
fn truncate_chars(mut text: String, max: usize) -> String {
    if let Some((cut, _)) = text.char_indices().nth(max) {
        text.truncate(cut);
    }
    text
}
