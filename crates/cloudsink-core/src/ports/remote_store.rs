//! Remote store port (driven/secondary port)
//!
//! Defines the interface the sync engine uses to talk to the hierarchical
//! object store. The HTTPS implementation lives in `cloudsink-api`; tests
//! use in-memory implementations.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific; the adapter's typed error stays downcastable.
//! - Failures every later call would repeat (rejected credentials) are
//!   wrapped in [`RemoteError`] so the engine can stop without knowing the
//!   adapter's error type.
//! - Uses `#[async_trait]` for async trait methods.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::newtypes::RemoteId;
use crate::domain::node::{NodeKind, RemoteNode};

/// Adapter-independent failures the engine must react to
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The store refused our credentials and refreshing them did not help
    #[error("Remote store rejected the credentials: {source}")]
    Unauthorized {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl RemoteError {
    /// Wraps an adapter error as [`RemoteError::Unauthorized`]
    pub fn unauthorized(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        RemoteError::Unauthorized {
            source: Box::new(source),
        }
    }

    /// True when `err`, or anything in its source chain, is [`RemoteError::Unauthorized`]
    #[must_use]
    pub fn is_unauthorized(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<RemoteError>(),
                Some(RemoteError::Unauthorized { .. })
            )
        })
    }
}

/// Server-side filter applied to a children listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildFilter {
    /// Every child
    All,
    /// Only children of the given kind
    Kind(NodeKind),
}

impl ChildFilter {
    /// Filter expression understood by the metadata endpoint, e.g. `kind:FOLDER`
    #[must_use]
    pub fn as_query(&self) -> Option<String> {
        match self {
            ChildFilter::All => None,
            ChildFilter::Kind(kind) => Some(format!("kind:{}", kind.as_str())),
        }
    }

    /// Whether a node passes this filter
    #[must_use]
    pub fn matches(&self, node: &RemoteNode) -> bool {
        match self {
            ChildFilter::All => true,
            ChildFilter::Kind(kind) => node.kind == *kind,
        }
    }
}

/// Where upload content comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// A file on disk, streamed without buffering
    File(PathBuf),
    /// Bytes synthesized in memory
    Buffer(Arc<[u8]>),
}

/// Whether an upload creates a new node or replaces an existing node's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    /// Create a new FILE node named `name` under `parent_id`
    New { parent_id: RemoteId, name: String },
    /// Replace the content of an existing FILE node
    Replace { node_id: RemoteId },
}

impl UploadTarget {
    #[must_use]
    pub fn is_replace(&self) -> bool {
        matches!(self, UploadTarget::Replace { .. })
    }
}

/// One logical upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub source: UploadSource,
    pub target: UploadTarget,
    /// Content-Type of the content part
    pub content_type: String,
}

/// Port trait for remote object store operations
///
/// ## Implementation Notes
///
/// - Implementations own authentication, including transparent token refresh.
///   Credentials that stay rejected surface as [`RemoteError::Unauthorized`].
/// - `upload` retries the whole logical upload once from a fresh source
///   before reporting failure.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Returns the store's root folder
    async fn root(&self) -> anyhow::Result<RemoteNode>;

    /// Lists the children of a folder, all pages aggregated in arrival order
    async fn list_children(
        &self,
        parent: &RemoteId,
        filter: ChildFilter,
    ) -> anyhow::Result<Vec<RemoteNode>>;

    /// Creates a folder named `name` under `parent`
    async fn create_folder(&self, parent: &RemoteId, name: &str) -> anyhow::Result<RemoteNode>;

    /// Uploads content, creating a new node or replacing an existing one
    async fn upload(&self, request: UploadRequest) -> anyhow::Result<RemoteNode>;

    /// Detaches `child` from `parent`
    async fn remove_child(&self, parent: &RemoteId, child: &RemoteId) -> anyhow::Result<()>;
}
