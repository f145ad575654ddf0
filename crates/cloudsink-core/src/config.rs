//! Configuration module for cloudsink.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, MimeTable, RemotePath};

/// Default token exchange endpoint for the long-lived refresh credential.
pub const DEFAULT_REFRESH_URL: &str = "https://drivesink.appspot.com/refresh";

/// Default metadata endpoint base URL.
pub const DEFAULT_METADATA_URL: &str = "https://cdws.us-east-1.amazonaws.com/drive/v1";

/// Default content endpoint base URL.
pub const DEFAULT_CONTENT_URL: &str = "https://content-na.drive.amazonaws.com/cdproxy";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for cloudsink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    /// Tracked file extensions and the Content-Type sent for each.
    pub extensions: BTreeMap<String, String>,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory to mirror.
    pub source: PathBuf,
    /// Remote folder path, e.g. `/Backup/Photos`.
    pub target: String,
    /// Write `<file>.md5` side-cars after hashing.
    pub persist_hashes: bool,
    /// Walk and count without creating folders or uploading.
    pub dry_run: bool,
}

/// Remote store endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL for node metadata requests.
    pub metadata_url: String,
    /// Base URL for content uploads.
    pub content_url: String,
}

/// Token exchange settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Endpoint exchanging the refresh credential for a bearer token.
    pub refresh_url: String,
    /// Long-lived refresh credential. `None` means only the token file is usable.
    pub refresh_token: Option<String>,
    /// Where the last token exchange response is persisted.
    pub token_file: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/cloudsink/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("cloudsink")
            .join("config.yaml")
    }

    /// Parsed sync target.
    pub fn target_path(&self) -> Result<RemotePath, DomainError> {
        RemotePath::new(self.sync.target.clone())
    }

    /// Validated extension table.
    pub fn mime_table(&self) -> Result<MimeTable, DomainError> {
        MimeTable::new(&self.extensions)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for Config {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            extensions: default_extensions(),
            api: ApiConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_extensions() -> BTreeMap<String, String> {
    [
        (".jpg", "image/jpeg"),
        (".jpeg", "image/jpeg"),
        (".png", "image/png"),
        (".gif", "image/gif"),
    ]
    .into_iter()
    .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
    .collect()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: dirs::picture_dir()
                .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
                .unwrap_or_else(|| PathBuf::from("~/Pictures")),
            target: "/Pictures".to_string(),
            persist_hashes: true,
            dry_run: false,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            content_url: DEFAULT_CONTENT_URL.to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("cloudsink");
        Self {
            refresh_url: DEFAULT_REFRESH_URL.to_string(),
            refresh_token: None,
            token_file: data_dir.join("token.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.target"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        let source_str = self.sync.source.to_string_lossy();
        if source_str.is_empty() {
            errors.push(ValidationError {
                field: "sync.source".into(),
                message: "must not be empty".into(),
            });
        } else if !source_str.starts_with('~') && !self.sync.source.is_dir() {
            errors.push(ValidationError {
                field: "sync.source".into(),
                message: format!("directory does not exist: {}", self.sync.source.display()),
            });
        }

        if let Err(e) = self.target_path() {
            errors.push(ValidationError {
                field: "sync.target".into(),
                message: e.to_string(),
            });
        }

        // --- extensions ---
        if self.extensions.is_empty() {
            errors.push(ValidationError {
                field: "extensions".into(),
                message: "at least one tracked extension is required".into(),
            });
        } else if let Err(e) = self.mime_table() {
            errors.push(ValidationError {
                field: "extensions".into(),
                message: e.to_string(),
            });
        }

        // --- api ---
        for (field, url) in [
            ("api.metadata_url", &self.api.metadata_url),
            ("api.content_url", &self.api.content_url),
            ("auth.refresh_url", &self.auth.refresh_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("'{url}' is not an http(s) URL"),
                });
            }
        }

        // --- auth ---
        if self
            .auth
            .refresh_token
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            errors.push(ValidationError {
                field: "auth.refresh_token".into(),
                message: "must not be blank when set".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use cloudsink_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .sync_source(PathBuf::from("/home/user/Pictures"))
///     .sync_target("/Backup/Pictures")
///     .sync_dry_run(true)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration (e.g. one loaded from disk).
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- sync ---

    pub fn sync_source(mut self, source: PathBuf) -> Self {
        self.config.sync.source = source;
        self
    }

    pub fn sync_target(mut self, target: impl Into<String>) -> Self {
        self.config.sync.target = target.into();
        self
    }

    pub fn sync_persist_hashes(mut self, persist: bool) -> Self {
        self.config.sync.persist_hashes = persist;
        self
    }

    pub fn sync_dry_run(mut self, dry_run: bool) -> Self {
        self.config.sync.dry_run = dry_run;
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
