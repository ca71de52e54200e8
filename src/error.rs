//! Error types for the browser-mediated operation layer.
//!
//! Config, cache and CLI code use `anyhow`; everything an operation can report back to
//! the host is a typed [`OperationError`] so callers can tell a timeout from an expired
//! login without string matching.

use thiserror::Error;

/// Failures raised by an embedded browser binding
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser session: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    #[error("browser session is closed")]
    SessionClosed,
}

/// Terminal failure of one bulk operation
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0:?}")]
    TimedOut(std::time::Duration),

    #[error("authentication expired, please log in again")]
    AuthExpired,

    #[error("no active organization found in browser session")]
    NoOrganization,

    #[error(transparent)]
    Session(#[from] BrowserError),

    #[error("failed to inject operation script: {0}")]
    Injection(String),

    #[error("remote script failed: {0}")]
    Script(String),

    #[error("malformed operation result: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl OperationError {
    /// Whether retrying the same operation may succeed without user action
    pub fn is_retryable(&self) -> bool {
        matches!(self, OperationError::TimedOut(_) | OperationError::Session(_))
    }
}
