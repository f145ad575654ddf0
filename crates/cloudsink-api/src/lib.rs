//! cloudsink API - Authenticated HTTPS client for the remote object store
//!
//! Provides async building blocks for:
//! - Bearer token lifecycle (persisted token file, refresh via token exchange)
//! - Authenticated requests with one transparent refresh-and-retry on 401
//! - Paginated children listing, root discovery, folder creation, child removal
//! - Streaming multipart uploads for new files and content replacement
//!
//! ## Modules
//!
//! - [`auth`] - Token manager: load, refresh and persist the access token
//! - [`client`] - Authenticated request layer
//! - [`nodes`] - Metadata endpoint operations
//! - [`upload`] - Multipart upload pipeline
//! - [`provider`] - [`IRemoteStore`](cloudsink_core::ports::IRemoteStore) adapter

pub mod auth;
pub mod client;
pub mod nodes;
pub mod provider;
pub mod upload;

use thiserror::Error;

/// Errors that can occur when talking to the remote store
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure (connection, DNS, TLS); not retried by the request layer
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The token exchange endpoint rejected the refresh credential
    #[error("Token exchange failed with status {status}: {body}")]
    Auth {
        /// HTTP status returned by the exchange endpoint
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// No refresh credential is configured, so no token can be obtained
    #[error("No refresh token configured and no usable token file")]
    MissingRefreshToken,

    /// Non-2xx response after any applicable retry
    #[error("Request failed with status {status}: {body}")]
    Request {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// A one-shot streamed body was already consumed when a retry was needed;
    /// the caller must restart the whole logical operation
    #[error("Request body stream already consumed; operation must be restarted")]
    StreamExhausted,

    /// The response could not be parsed or was missing required fields
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A local file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// True when the failure can only be recovered by restarting the logical
    /// operation from a fresh source, not by resending the raw request
    #[must_use]
    pub fn requires_restart(&self) -> bool {
        matches!(self, ApiError::StreamExhausted)
    }

    /// True when no token can be obtained, or a fresh token was still
    /// refused with 401; repeating the operation cannot succeed
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ApiError::Auth { .. } | ApiError::MissingRefreshToken => true,
            ApiError::Request { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status, .. } | ApiError::Request { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
