//! DriveStore - IRemoteStore implementation for the remote object store
//!
//! Wraps the [`ApiClient`] session and delegates to the [`nodes`] and
//! [`upload`] modules to fulfil the [`IRemoteStore`] port contract.
//!
//! ## Design Notes
//!
//! - `ApiClient` only needs `&self` (the token lives behind a lock inside
//!   the token manager), so no outer mutex is required.
//! - Errors keep their [`ApiError`] type inside the `anyhow::Error`, so
//!   callers can downcast to inspect the HTTP status.
//! - Credential failures are wrapped in [`RemoteError::Unauthorized`], the
//!   marker the sync engine aborts on; the `ApiError` stays its source.

use anyhow::{Context, Result};
use tracing::debug;

use cloudsink_core::domain::{RemoteId, RemoteNode};
use cloudsink_core::ports::{ChildFilter, IRemoteStore, RemoteError, UploadRequest};

use crate::client::ApiClient;
use crate::nodes;
use crate::upload;
use crate::ApiError;

// ============================================================================
// DriveStore
// ============================================================================

/// Remote store backed by the metadata and content HTTPS endpoints
pub struct DriveStore {
    client: ApiClient,
}

impl DriveStore {
    /// Creates a new `DriveStore` over the given session
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// The underlying session
    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

/// Converts an [`ApiError`], marking credential failures as unauthorized
fn lift(err: ApiError) -> anyhow::Error {
    if err.is_unauthorized() {
        RemoteError::unauthorized(err).into()
    } else {
        err.into()
    }
}

#[async_trait::async_trait]
impl IRemoteStore for DriveStore {
    async fn root(&self) -> Result<RemoteNode> {
        debug!("DriveStore::root");
        nodes::root(&self.client)
            .await
            .map_err(lift)
            .context("Failed to look up the remote root folder")
    }

    /// Delegates to [`nodes::list_children`], which follows every cursor
    async fn list_children(&self, parent: &RemoteId, filter: ChildFilter) -> Result<Vec<RemoteNode>> {
        debug!(parent = %parent, ?filter, "DriveStore::list_children");
        nodes::list_children(&self.client, parent, filter)
            .await
            .map_err(lift)
            .with_context(|| format!("Failed to list children of {parent}"))
    }

    async fn create_folder(&self, parent: &RemoteId, name: &str) -> Result<RemoteNode> {
        debug!(parent = %parent, name, "DriveStore::create_folder");
        nodes::create_folder(&self.client, parent, name)
            .await
            .map_err(lift)
            .with_context(|| format!("Failed to create folder '{name}' under {parent}"))
    }

    /// Delegates to [`upload::upload`], which restarts once on failure
    async fn upload(&self, request: UploadRequest) -> Result<RemoteNode> {
        debug!(replace = request.target.is_replace(), "DriveStore::upload");
        upload::upload(&self.client, &request)
            .await
            .map_err(lift)
            .context("Upload failed")
    }

    async fn remove_child(&self, parent: &RemoteId, child: &RemoteId) -> Result<()> {
        debug!(parent = %parent, child = %child, "DriveStore::remove_child");
        nodes::remove_child(&self.client, parent, child)
            .await
            .map_err(lift)
            .with_context(|| format!("Failed to remove {child} from {parent}"))
    }
}

// ============================================================================
// Tests
// ============================================================================
