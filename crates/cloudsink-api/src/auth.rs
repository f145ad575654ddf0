//! Access token lifecycle
//!
//! The [`TokenManager`] owns the single live bearer token. It loads the
//! last exchange response from a token file when that file is still fresh,
//! and otherwise exchanges the long-lived refresh credential at the token
//! exchange endpoint (`POST`, form body `refresh_token=<value>`).
//!
//! Every successful exchange is persisted, pretty-printed, so the next run
//! can start without a network round trip.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use cloudsink_core::config::AuthConfig;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::ApiError;

/// Tokens persisted with `expires_in` are considered stale this long before expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Fields of the exchange response we act on; the full object is persisted as-is
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Settings for a [`TokenManager`]
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// Token exchange endpoint
    pub refresh_url: String,
    /// Long-lived refresh credential
    pub refresh_token: Option<String>,
    /// Persisted exchange response
    pub token_file: PathBuf,
}

impl From<&AuthConfig> for TokenSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            refresh_url: config.refresh_url.clone(),
            refresh_token: config.refresh_token.clone(),
            token_file: config.token_file.clone(),
        }
    }
}

/// Owner of the in-memory access token
pub struct TokenManager {
    http: Client,
    settings: TokenSettings,
    current: RwLock<Option<String>>,
}

impl TokenManager {
    /// Creates a manager; no I/O happens until the first [`auth_header`](Self::auth_header)
    pub fn new(http: Client, settings: TokenSettings) -> Self {
        Self {
            http,
            settings,
            current: RwLock::new(None),
        }
    }

    /// Returns the `Authorization` header value for the current token
    ///
    /// Without `force_refresh`, the in-memory token is used, then the token
    /// file; if neither is usable this escalates to a refresh. With
    /// `force_refresh`, the refresh credential is always exchanged.
    ///
    /// # Errors
    /// [`ApiError::Auth`] if the exchange endpoint answers non-2xx,
    /// [`ApiError::MissingRefreshToken`] if a refresh is needed but impossible.
    pub async fn auth_header(&self, force_refresh: bool) -> Result<String, ApiError> {
        if !force_refresh {
            if let Some(token) = self.current.read().await.as_deref() {
                return Ok(bearer(token));
            }

            if let Some(token) = load_persisted(&self.settings.token_file).await {
                debug!(path = %self.settings.token_file.display(), "Using persisted access token");
                let header = bearer(&token);
                *self.current.write().await = Some(token);
                return Ok(header);
            }

            debug!("No usable persisted token, refreshing");
        }

        let token = self.refresh().await?;
        Ok(bearer(&token))
    }

    /// Exchanges the refresh credential for a new access token and persists it
    ///
    /// Failures here are not retried; the request layer decides whether to
    /// call again.
    pub async fn refresh(&self) -> Result<String, ApiError> {
        let refresh_token = self
            .settings
            .refresh_token
            .as_deref()
            .ok_or(ApiError::MissingRefreshToken)?;

        info!(url = %self.settings.refresh_url, "Refreshing access token");

        let response = self
            .http
            .post(&self.settings.refresh_url)
            .form(&[("refresh_token", refresh_token)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Token exchange rejected");
            return Err(ApiError::Auth {
                status: status.as_u16(),
                body,
            });
        }

        let raw: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("token response is not JSON: {e}")))?;
        let parsed: TokenResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            ApiError::InvalidResponse(format!("token response without access_token: {e}"))
        })?;

        if let Err(e) = persist(&self.settings.token_file, &raw).await {
            warn!(
                path = %self.settings.token_file.display(),
                error = %e,
                "Failed to persist refreshed token; continuing with in-memory token"
            );
        }

        *self.current.write().await = Some(parsed.access_token.clone());
        info!(expires_in = ?parsed.expires_in, "Access token refreshed");
        Ok(parsed.access_token)
    }

    /// The token file this manager reads and writes
    pub fn token_file(&self) -> &Path {
        &self.settings.token_file
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Reads the token file; `None` when absent, malformed or expired
async fn load_persisted(path: &Path) -> Option<String> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Token file not readable");
            return None;
        }
    };

    let token: TokenResponse = match serde_json::from_str(&content) {
        Ok(token) => token,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed token file");
            return None;
        }
    };

    if let Some(expires_in) = token.expires_in {
        let written = tokio::fs::metadata(path).await.ok()?.modified().ok()?;
        let lifetime = Duration::from_secs(expires_in).saturating_sub(EXPIRY_MARGIN);
        let age = SystemTime::now()
            .duration_since(written)
            .unwrap_or(Duration::ZERO);
        if age >= lifetime {
            debug!(age_secs = age.as_secs(), expires_in, "Persisted token expired");
            return None;
        }
    }

    if token.access_token.is_empty() {
        return None;
    }

    Some(token.access_token)
}

async fn persist(path: &Path, raw: &serde_json::Value) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let pretty = serde_json::to_string_pretty(raw)
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
    tokio::fs::write(path, pretty).await?;
    debug!(path = %path.display(), "Persisted token response");
    Ok(())
}
