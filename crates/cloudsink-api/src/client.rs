//! Authenticated request layer
//!
//! [`ApiClient`] is the session object for one run: it owns the HTTP client,
//! the two endpoint base URLs and the [`TokenManager`]. Every request goes
//! through [`ApiClient::execute`], which injects the bearer header and, on a
//! first 401, forces one token refresh and re-issues the same request.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cloudsink_api::client::{ApiClient, Endpoint, RequestBody, RequestSpec};
//! use cloudsink_core::config::Config;
//! use reqwest::Method;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ApiClient::from_config(&Config::default());
//! let spec = RequestSpec::new(Method::GET, Endpoint::Metadata, "/nodes")
//!     .query("filters", "isRoot:true");
//! let root: serde_json::Value = client.execute_json(&spec, RequestBody::Empty).await?;
//! println!("{root}");
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use cloudsink_core::config::Config;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::auth::{TokenManager, TokenSettings};
use crate::ApiError;

// ============================================================================
// Request description
// ============================================================================

/// Which base URL a request is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Node metadata: listing, folder creation, root discovery, removal
    Metadata,
    /// Content uploads
    Content,
}

/// Everything needed to (re-)issue one request, except its body
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub endpoint: Endpoint,
    /// Path relative to the endpoint base URL, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Whether a 401 may trigger a token refresh and one re-issue
    pub refresh_on_unauthorized: bool,
}

impl RequestSpec {
    pub fn new(method: Method, endpoint: Endpoint, path: impl Into<String>) -> Self {
        Self {
            method,
            endpoint,
            path: path.into(),
            query: Vec::new(),
            refresh_on_unauthorized: true,
        }
    }

    /// Disables the refresh-and-retry, for a call whose token was already
    /// refreshed once on behalf of the same logical operation
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }

    /// Appends a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Request body, distinguishing replayable bodies from one-shot streams
#[derive(Debug)]
pub enum RequestBody {
    Empty,
    /// Serialized on every attempt
    Json(serde_json::Value),
    /// In-memory bytes; cheap to resend
    Bytes { content_type: String, data: Bytes },
    /// Streamed body; can be sent once only
    Stream {
        content_type: String,
        body: Option<reqwest::Body>,
    },
}

impl RequestBody {
    /// Wraps a one-shot streaming body
    pub fn stream(content_type: impl Into<String>, body: reqwest::Body) -> Self {
        RequestBody::Stream {
            content_type: content_type.into(),
            body: Some(body),
        }
    }

    /// Attaches the body for one attempt
    ///
    /// # Errors
    /// [`ApiError::StreamExhausted`] if a streamed body was already sent
    fn attach(&mut self, builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match self {
            RequestBody::Empty => Ok(builder),
            RequestBody::Json(value) => Ok(builder.json(&*value)),
            RequestBody::Bytes { content_type, data } => Ok(builder
                .header(CONTENT_TYPE, content_type.as_str())
                .body(data.clone())),
            RequestBody::Stream { content_type, body } => {
                let body = body.take().ok_or(ApiError::StreamExhausted)?;
                Ok(builder.header(CONTENT_TYPE, content_type.as_str()).body(body))
            }
        }
    }
}

// ============================================================================
// ApiClient
// ============================================================================

/// HTTP session for the remote store
pub struct ApiClient {
    http: Client,
    metadata_url: String,
    content_url: String,
    tokens: TokenManager,
}

impl ApiClient {
    /// Creates a client for the given endpoints and token settings
    pub fn new(
        metadata_url: impl Into<String>,
        content_url: impl Into<String>,
        token_settings: TokenSettings,
    ) -> Self {
        let http = Client::new();
        Self {
            tokens: TokenManager::new(http.clone(), token_settings),
            http,
            metadata_url: trim_base(metadata_url.into()),
            content_url: trim_base(content_url.into()),
        }
    }

    /// Creates a client from the `api` and `auth` configuration sections
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api.metadata_url.clone(),
            config.api.content_url.clone(),
            TokenSettings::from(&config.auth),
        )
    }

    /// The token manager owning this session's bearer token
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Absolute URL for a path on an endpoint
    pub fn url(&self, endpoint: Endpoint, path: &str) -> String {
        let base = match endpoint {
            Endpoint::Metadata => &self.metadata_url,
            Endpoint::Content => &self.content_url,
        };
        format!("{base}{path}")
    }

    /// Sends a request and returns the raw body text of a 2xx response
    ///
    /// A 401 on the first attempt triggers a forced token refresh and exactly
    /// one re-issue of the same request, unless the spec was built
    /// [`without_refresh`](RequestSpec::without_refresh). A streamed body
    /// cannot be re-issued and yields [`ApiError::StreamExhausted`] instead.
    ///
    /// # Errors
    /// - [`ApiError::Transport`] on network failure (never retried here)
    /// - [`ApiError::Request`] on any other non-2xx status, or a second 401
    /// - [`ApiError::Auth`] if the forced refresh fails
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        mut body: RequestBody,
    ) -> Result<String, ApiError> {
        let url = self.url(spec.endpoint, &spec.path);
        let mut auth_header = self.tokens.auth_header(false).await?;
        let mut refreshed = !spec.refresh_on_unauthorized;

        loop {
            let builder = self
                .http
                .request(spec.method.clone(), &url)
                .header(AUTHORIZATION, auth_header.as_str())
                .query(&spec.query);
            let builder = body.attach(builder)?;

            debug!(method = %spec.method, url = %url, "Sending request");
            let response = builder.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.text().await?);
            }

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                info!(method = %spec.method, url = %url, "Received 401, refreshing token and retrying once");
                refreshed = true;
                auth_header = self.tokens.auth_header(true).await?;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            warn!(
                method = %spec.method,
                url = %url,
                status = status.as_u16(),
                "Request failed"
            );
            return Err(ApiError::Request {
                status: status.as_u16(),
                body: text,
            });
        }
    }

    /// Like [`execute`](Self::execute), decoding the 2xx body as JSON
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        spec: &RequestSpec,
        body: RequestBody,
    ) -> Result<T, ApiError> {
        let text = self.execute(spec, body).await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("{} {}: {e}", spec.method, spec.path))
        })
    }
}

fn trim_base(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
