//! Domain error types
//!
//! Validation failures for newtypes and configuration-derived values.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid remote node ID
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid content fingerprint (expected a hex MD5 digest)
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Unknown node kind reported by the remote store
    #[error("Unknown node kind: {0}")]
    UnknownNodeKind(String),

    /// Invalid MIME type or file extension in the extension table
    #[error("Invalid MIME mapping: {0}")]
    InvalidMimeMapping(String),
}
