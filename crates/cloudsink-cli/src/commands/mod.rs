//! CLI subcommands and the configuration loading they share

pub mod auth;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cloudsink_core::config::Config;

/// Loads the configuration
///
/// An explicit `--config` path must exist and parse; the default path
/// silently falls back to built-in defaults. Leading `~` is expanded in
/// local paths.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    config.sync.source = expand_tilde(&config.sync.source.to_string_lossy());
    config.auth.token_file = expand_tilde(&config.auth.token_file.to_string_lossy());
    Ok(config)
}

/// Expand tilde (~) in a path string to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
