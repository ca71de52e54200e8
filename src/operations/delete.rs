//! Delete conversations remotely, then drop them from the store.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::driver::{ReadyContext, Task};
use super::script::{ScriptConfig, ScriptResult, build_script};
use super::state::{OperationHandle, ProgressMode};
use crate::config::OperationsConfig;
use crate::error::OperationError;
use crate::store::RecordStore;

const BODY: &str = r#"
        const results = [];
        for (let i = 0; i < CONFIG.ids.length; i++) {
          if (i > 0) await sleep(CONFIG.itemDelayMs);
          const id = CONFIG.ids[i];
          try {
            await api('DELETE', '/chat_conversations/' + encodeURIComponent(id));
            results.push({ id, ok: true });
          } catch (e) {
            results.push({ id, ok: false, error: String((e && e.message) || e) });
          }
          tick();
        }
        return { results };
"#;

#[derive(Debug, Deserialize)]
struct DeletePayload {
    #[serde(default)]
    results: Vec<DeleteResult>,
}

#[derive(Debug, Deserialize)]
struct DeleteResult {
    id: String,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteSummary {
    pub deleted: usize,
    pub failed: usize,
    /// Ids that stay in the store (still selected), with the reported error
    pub failures: Vec<(String, String)>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteParams<'a> {
    ids: &'a [String],
    item_delay_ms: u64,
}

pub struct DeleteTask {
    ids: Vec<String>,
    item_delay_ms: u64,
    timeout: Duration,
}

impl DeleteTask {
    pub fn new(ids: Vec<String>, config: &OperationsConfig) -> Self {
        Self {
            ids,
            item_delay_ms: config.delete_item_delay_ms,
            timeout: Duration::from_secs(config.delete_timeout_secs),
        }
    }
}

impl Task for DeleteTask {
    type Output = DeleteSummary;

    fn title(&self) -> String {
        "Deleting conversations".to_string()
    }

    fn initial_status(&self) -> String {
        format!("Deleting {} conversations", self.ids.len())
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
            params: DeleteParams { ids: &self.ids, item_delay_ms: self.item_delay_ms },
        };
        Ok(build_script(&config, BODY)?)
    }

    fn merge(
        &mut self,
        result: ScriptResult,
        store: &mut RecordStore,
    ) -> Result<DeleteSummary, OperationError> {
        let payload: DeletePayload = result.into_data()?;

        let mut removed = Vec::new();
        let mut summary = DeleteSummary::default();
        for result in payload.results {
            // Only ids this task asked for may leave the store
            if !self.ids.contains(&result.id) {
                tracing::warn!(id = %result.id, "Ignoring delete result for unrequested id");
                continue;
            }
            if result.ok {
                removed.push(result.id);
            } else {
                let error = result.error.unwrap_or_else(|| "unknown error".to_string());
                tracing::warn!(id = %result.id, error = %error, "Delete failed");
                summary.failures.push((result.id, error));
            }
        }

        summary.deleted = removed.len();
        summary.failed = summary.failures.len();
        store.remove_ids(&removed);

        tracing::info!(deleted = summary.deleted, failed = summary.failed, "Delete finished");
        Ok(summary)
    }

    fn progress_text(&self, progress: u64, total: Option<u64>) -> String {
        format!("Deleted {} of {}", progress, total.unwrap_or(self.ids.len() as u64))
    }
}
