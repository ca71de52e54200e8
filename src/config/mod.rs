//! Application configuration.
//!
//! Loaded from `<config_dir>/chat-history-manager/config.toml` when present. Every
//! section and field has a default, so a partial file only overrides what it names.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::utils::environment::{APP_DIR_NAME, get_config_dir, get_data_dir};

pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Persistent browser profile; defaults to the platform data directory
    pub profile_dir: Option<PathBuf>,
    pub service: ServiceConfig,
    pub operations: OperationsConfig,
    pub cache: CacheConfig,
}

/// Where the conversation service lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub entry_path: String,
    /// The page counts as ready (logged in) once its path starts with this
    pub ready_path_prefix: String,
    pub api_base: String,
    pub org_cookie: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://claude.ai".to_string(),
            entry_path: "/recents".to_string(),
            ready_path_prefix: "/recents".to_string(),
            api_base: "https://claude.ai/api".to_string(),
            org_cookie: "lastActiveOrg".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn entry_url(&self) -> Result<Url> {
        let base = Url::parse(&self.base_url).context("Invalid service base_url")?;
        base.join(&self.entry_path).context("Invalid service entry_path")
    }
}

/// Timings, batching and limits for the bulk operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationsConfig {
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub fetch_timeout_secs: u64,
    pub index_timeout_secs: u64,
    pub export_timeout_secs: u64,
    pub delete_timeout_secs: u64,
    pub page_ceiling: usize,
    pub index_batch_size: usize,
    pub index_batch_delay_ms: u64,
    pub max_content_chars: usize,
    pub export_item_delay_ms: u64,
    pub delete_item_delay_ms: u64,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            settle_delay_ms: 1500,
            fetch_timeout_secs: 300,
            index_timeout_secs: 1800,
            export_timeout_secs: 1800,
            delete_timeout_secs: 900,
            page_ceiling: 200,
            index_batch_size: 8,
            index_batch_delay_ms: 500,
            max_content_chars: 50_000,
            export_item_delay_ms: 300,
            delete_item_delay_ms: 300,
        }
    }
}

impl OperationsConfig {
    pub fn poll_interval(&self) -> Duration {
        // Zero would spin the poll loop
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub metadata_max_age_hours: i64,
    pub content_index_cap: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { metadata_max_age_hours: 24, content_index_cap: 2000 }
    }
}

impl AppConfig {
    /// Default config file location
    pub fn default_path() -> Result<PathBuf> {
        Ok(get_config_dir()?.join(APP_DIR_NAME).join(CONFIG_FILENAME))
    }

    /// Load from `path`, or from the default location when `None`.
    /// A missing file yields the defaults; an unreadable or invalid one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Browser profile directory holding the auth cookies
    pub fn profile_dir(&self) -> Result<PathBuf> {
        match &self.profile_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_data_dir()?.join(APP_DIR_NAME).join("browser-profile")),
        }
    }
}
