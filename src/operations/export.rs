//! Export selected conversations to a JSON file.
//!
//! Full exports fetch each conversation through the page, one at a time with a fixed
//! delay. Metadata exports need no browser and are written straight from the store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::driver::{ReadyContext, Task};
use super::script::{ScriptConfig, ScriptResult, build_script};
use super::state::{OperationHandle, ProgressMode};
use crate::config::OperationsConfig;
use crate::error::OperationError;
use crate::models::{
    ConversationDetail, ExportDocument, ExportEntry, ExportType, FullConversation,
    MetadataConversation,
};
use crate::store::RecordStore;
use crate::utils::write_json_atomic;

const BODY: &str = r#"
        const items = [];
        for (let i = 0; i < CONFIG.ids.length; i++) {
          if (i > 0) await sleep(CONFIG.itemDelayMs);
          const id = CONFIG.ids[i];
          try {
            const detail = await api('GET', '/chat_conversations/' + encodeURIComponent(id) + '?tree=true&rendering_mode=messages');
            items.push({ id, detail });
          } catch (e) {
            items.push({ id, error: String((e && e.message) || e) });
          }
          tick();
        }
        return { items };
"#;

#[derive(Debug, Deserialize)]
struct ExportPayload {
    #[serde(default)]
    items: Vec<ExportedItem>,
}

#[derive(Debug, Deserialize)]
struct ExportedItem {
    id: String,
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub exported: usize,
    pub failed: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportParams<'a> {
    ids: &'a [String],
    item_delay_ms: u64,
}

pub struct ExportTask {
    ids: Vec<String>,
    destination: PathBuf,
    item_delay_ms: u64,
    timeout: Duration,
}

impl ExportTask {
    pub fn new(ids: Vec<String>, destination: impl Into<PathBuf>, config: &OperationsConfig) -> Self {
        Self {
            ids,
            destination: destination.into(),
            item_delay_ms: config.export_item_delay_ms,
            timeout: Duration::from_secs(config.export_timeout_secs),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

impl Task for ExportTask {
    type Output = ExportSummary;

    fn title(&self) -> String {
        "Exporting conversations".to_string()
    }

    fn initial_status(&self) -> String {
        format!("Exporting {} conversations", self.ids.len())
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
            params: ExportParams { ids: &self.ids, item_delay_ms: self.item_delay_ms },
        };
        Ok(build_script(&config, BODY)?)
    }

    fn merge(
        &mut self,
        result: ScriptResult,
        _store: &mut RecordStore,
    ) -> Result<ExportSummary, OperationError> {
        let payload: ExportPayload = result.into_data()?;

        let entries: Vec<ExportEntry> = payload.items.into_iter().map(export_entry).collect();
        let failed = entries.iter().filter(|e| matches!(e, ExportEntry::Failed { .. })).count();
        let exported = entries.len() - failed;

        let document = ExportDocument::new(ExportType::Full, entries);
        write_json_atomic(&self.destination, &document)?;

        tracing::info!(path = %self.destination.display(), exported, failed, "Export written");
        Ok(ExportSummary { path: self.destination.clone(), exported, failed })
    }

    fn progress_text(&self, progress: u64, total: Option<u64>) -> String {
        format!("Exported {} of {}", progress, total.unwrap_or(self.ids.len() as u64))
    }
}

fn export_entry(item: ExportedItem) -> ExportEntry {
    if let Some(error) = item.error {
        return ExportEntry::Failed { id: item.id, error };
    }
    let Some(detail) = item.detail else {
        return ExportEntry::Failed { id: item.id, error: "empty response".to_string() };
    };
    match serde_json::from_value::<ConversationDetail>(detail) {
        Ok(detail) => ExportEntry::Full(FullConversation::from(detail)),
        Err(e) => {
            tracing::debug!(id = %item.id, error = %e, "Malformed conversation detail");
            ExportEntry::Failed { id: item.id, error: format!("malformed conversation: {}", e) }
        }
    }
}

/// Write `{id, name, updated_at}` for each of `ids` known to the store. No browser needed.
pub fn export_metadata(
    store: &RecordStore,
    ids: &[String],
    destination: &Path,
) -> Result<ExportSummary, OperationError> {
    let entries: Vec<ExportEntry> = ids
        .iter()
        .filter_map(|id| store.get(id))
        .map(|record| ExportEntry::Metadata(MetadataConversation::from(record)))
        .collect();
    let exported = entries.len();

    let document = ExportDocument::new(ExportType::Metadata, entries);
    write_json_atomic(destination, &document)?;

    tracing::info!(path = %destination.display(), exported, "Metadata export written");
    Ok(ExportSummary { path: destination.to_path_buf(), exported, failed: 0 })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::models::ConversationRecord;

    #[test]
    fn test_merge_writes_document_with_inline_failures() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.json");
        let mut task =
            ExportTask::new(vec!["a".into(), "b".into()], &path, &OperationsConfig::default());
        let result: ScriptResult = serde_json::from_value(json!({
            "success": true,
            "data": {"items": [
                {"id": "a", "detail": {
                    "uuid": "a", "name": "First", "model": "m-1",
                    "chat_messages": [
                        {"uuid": "m1", "sender": "human", "text": "hi"},
                        {"uuid": "m2", "sender": "assistant", "content": [{"type": "text", "text": "hello"}]}
                    ]
                }},
                {"id": "b", "error": "HTTP 404"}
            ]}
        }))
        .unwrap();

        let summary = task.merge(result, &mut RecordStore::new()).unwrap();
        assert_eq!(summary.exported, 1);
        assert_eq!(summary.failed, 1);

        let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["export_type"], "full");
        assert_eq!(doc["export_version"], "1.0");
        assert_eq!(doc["total_conversations"], 2);
        assert_eq!(doc["conversations"][0]["name"], "First");
        assert_eq!(doc["conversations"][0]["chat_messages"][1]["text"], "hello");
        assert_eq!(doc["conversations"][1], json!({"id": "b", "error": "HTTP 404"}));
    }

    #[test]
    fn test_malformed_detail_becomes_failure() {
        let entry = export_entry(ExportedItem {
            id: "x".into(),
            detail: Some(json!({"name": "no uuid"})),
            error: None,
        });
        assert!(matches!(entry, ExportEntry::Failed { ref id, .. } if id == "x"));
    }

    #[test]
    fn test_export_metadata_skips_unknown_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.json");
        let store = RecordStore::from_records(vec![
            ConversationRecord::new("a", "Alpha", Utc::now()),
            ConversationRecord::new("b", "Beta", Utc::now()),
        ]);

        let summary =
            export_metadata(&store, &["b".to_string(), "missing".to_string()], &path).unwrap();
        assert_eq!(summary.exported, 1);

        let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["export_type"], "metadata");
        assert_eq!(doc["conversations"][0]["id"], "b");
        assert_eq!(doc["conversations"][0]["name"], "Beta");
    }
}
