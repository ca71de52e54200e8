use std::path::PathBuf;

use anyhow::{Context, Result};

/// Directory name used under each platform base directory
pub const APP_DIR_NAME: &str = "chat-history-manager";

/// Platform config directory (e.g. `~/.config` on Linux)
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir().context("Failed to get platform config directory")
}

/// Platform data directory, home of the persistent browser profile
pub fn get_data_dir() -> Result<PathBuf> {
    dirs::data_dir().context("Failed to get platform data directory")
}

/// Platform cache directory for the record snapshots
pub fn get_cache_dir() -> Result<PathBuf> {
    dirs::cache_dir().context("Failed to get platform cache directory")
}

/// `<cache_dir>/chat-history-manager`
pub fn app_cache_dir() -> Result<PathBuf> {
    Ok(get_cache_dir()?.join(APP_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_cache_dir_ends_with_app_name() {
        // Headless CI boxes may lack a cache dir; only check the shape when present
        if let Ok(dir) = app_cache_dir() {
            assert!(dir.ends_with(APP_DIR_NAME));
        }
    }
}
