//! Shared pieces of the scripts injected into the browser page.
//!
//! Every task script is wrapped in the same prelude. It publishes three globals the
//! driver polls: a monotonic progress counter, a completion flag and a result object
//! `{success, error, data}`. Errors inside the task body become a failed result and
//! never escape the page.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OperationError;

/// Error code a task body reports when the service rejects the session (401/403)
pub const AUTH_EXPIRED_CODE: &str = "auth_expired";

const PRELUDE: &str = r#"(() => {
  const CONFIG = __CONFIG__;
  window.__chmProgress = 0;
  window.__chmDone = false;
  window.__chmResult = null;
  const sleep = (ms) => new Promise((resolve) => setTimeout(resolve, ms));
  const tick = (n = 1) => { window.__chmProgress += n; };
  class AuthExpired extends Error {}
  const api = async (method, path) => {
    const response = await fetch(CONFIG.apiBase + '/organizations/' + CONFIG.orgId + path, {
      method,
      credentials: 'include',
      headers: { 'Content-Type': 'application/json' },
    });
    if (response.status === 401 || response.status === 403) {
      throw new AuthExpired('HTTP ' + response.status);
    }
    if (!response.ok) {
      throw new Error('HTTP ' + response.status);
    }
    const text = await response.text();
    return text ? JSON.parse(text) : null;
  };
  const finish = (result) => {
    window.__chmResult = result;
    window.__chmDone = true;
  };
  (async () => {
    try {
      const data = await (async () => {
__BODY__
      })();
      finish({ success: true, error: null, data });
    } catch (e) {
      const error = e instanceof AuthExpired ? 'auth_expired' : String((e && e.message) || e);
      finish({ success: false, error, data: null });
    }
  })();
  return true;
})()"#;

/// Read all three published globals in a single evaluation
pub const POLL_EXPRESSION: &str = "({ progress: window.__chmProgress || 0, done: window.__chmDone === true, result: window.__chmResult || null })";

/// Values baked into every injected script
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptConfig<P: Serialize> {
    pub api_base: String,
    pub org_id: String,
    #[serde(flatten)]
    pub params: P,
}

/// Wrap a task body (the inside of an async function returning the result data) in
/// the prelude. Parameters are embedded as JSON, so ids cannot break out of the script.
pub fn build_script<P: Serialize>(
    config: &ScriptConfig<P>,
    body: &str,
) -> Result<String, serde_json::Error> {
    let config_json = serde_json::to_string(config)?;
    // Body first: the config placeholder precedes it, and ids may contain anything
    Ok(PRELUDE.replacen("__BODY__", body, 1).replacen("__CONFIG__", &config_json, 1))
}

/// State read from the page on each poll
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollState {
    #[serde(default)]
    pub progress: u64,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub result: Option<Value>,
}

/// Result object published by the prelude
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ScriptResult {
    /// Turn a failed result into the matching error, or decode the data payload
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, OperationError> {
        if !self.success {
            let error = self.error.unwrap_or_else(|| "unknown error".to_string());
            if error == AUTH_EXPIRED_CODE {
                return Err(OperationError::AuthExpired);
            }
            return Err(OperationError::Script(error));
        }
        decode_payload(self.data.unwrap_or(Value::Null))
    }
}

/// The one decode step for values coming back from the page.
///
/// Some bindings hand back evaluation results as JSON text rather than structured
/// values; a string is parsed once, anything else is decoded directly.
pub fn decode_payload<T: DeserializeOwned>(value: Value) -> Result<T, OperationError> {
    match value {
        Value::String(text) => Ok(serde_json::from_str(&text)?),
        other => Ok(serde_json::from_value(other)?),
    }
}
