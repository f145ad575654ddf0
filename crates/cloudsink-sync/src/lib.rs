//! cloudsink Sync - One-way reconciliation engine
//!
//! Provides:
//! - Cached content fingerprints with `.md5` side-car files
//! - Local directory listing
//! - Remote path resolution (walk or create folders segment by segment)
//! - The recursive sync driver pairing local entries with remote children
//!
//! ## Modules
//!
//! - [`engine`] - Sync driver and run report
//! - [`fingerprint`] - Fingerprint cache
//! - [`local`] - Local directory listing
//! - [`resolver`] - Remote path resolver

pub mod engine;
pub mod fingerprint;
pub mod local;
pub mod resolver;

#[cfg(test)]
mod testing;

use std::path::PathBuf;

use cloudsink_core::domain::NodeKind;
use cloudsink_core::ports::RemoteError;
use thiserror::Error;

/// Errors that abort a sync run or the processing of one folder
#[derive(Debug, Error)]
pub enum SyncError {
    /// A local entry and the remote node of the same name differ in kind
    ///
    /// Never resolved automatically; the whole run stops.
    #[error("Conflict at {path}: local entry is a {local} but the remote node is a {remote}")]
    Conflict {
        /// Local path of the offending entry
        path: PathBuf,
        /// Kind implied by the local entry
        local: NodeKind,
        /// Kind reported by the remote store
        remote: NodeKind,
    },

    /// The remote store rejected our credentials; every later call would too
    #[error("Authentication failed: {0:#}")]
    Auth(anyhow::Error),

    /// A remote call needed to continue (listing, folder creation, root lookup) failed
    #[error("Remote store error: {0:#}")]
    Remote(anyhow::Error),

    /// A local directory could not be read
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// True for errors that must stop the whole run rather than one folder
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Conflict { .. } | SyncError::Auth(_))
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        if RemoteError::is_unauthorized(&err) {
            SyncError::Auth(err)
        } else {
            SyncError::Remote(err)
        }
    }
}
