//! Ports to the embedded browser.
//!
//! The manager never talks to the conversation service directly: the only credentials
//! are the cookies living inside a logged-in browser profile. A host binds these traits
//! to its webview (or a CDP-driven browser) and the operation driver does the rest.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::BrowserError;

/// One live browser page bound to a persistent profile
#[async_trait]
pub trait BrowserSession: Send {
    /// Start navigating to `url`. Resolves once the navigation is committed.
    async fn navigate(&mut self, url: &Url) -> Result<(), BrowserError>;

    /// URL of the page currently shown (changes while the user logs in)
    async fn current_url(&mut self) -> Result<Url, BrowserError>;

    /// Evaluate a script expression in the page and return its JSON value
    async fn evaluate(&mut self, script: &str) -> Result<Value, BrowserError>;

    /// Read a cookie visible to the current page
    async fn cookie(&mut self, name: &str) -> Result<Option<String>, BrowserError>;

    /// Tear the session down. Must be safe to call more than once.
    async fn close(&mut self);
}

/// Opens browser sessions on a profile directory so auth cookies persist across runs
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, profile_dir: &Path) -> Result<Box<dyn BrowserSession>, BrowserError>;
}
