//! Remote path resolver
//!
//! Walks a remote path one segment at a time from a starting folder. At each
//! level the folder children are listed and the first one whose name equals
//! the segment is entered; when none matches, the folder is created. Once a
//! segment had to be created its subtree is known to be empty, so the
//! remaining segments are created directly without listing.

use anyhow::Context;
use tracing::{debug, info};

use cloudsink_core::domain::{NodeKind, RemoteNode};
use cloudsink_core::ports::{ChildFilter, IRemoteStore};

use crate::SyncError;

/// Result of resolving a path
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The node addressed by the last segment (the start node for no segments)
    pub node: RemoteNode,
    /// Folders created along the way, in segment order
    pub created: Vec<RemoteNode>,
}

/// Result of looking a path up without creating anything
#[derive(Debug, Clone)]
pub struct Lookup {
    /// Deepest existing node along the path
    pub node: RemoteNode,
    /// Segments below `node` that do not exist yet
    pub missing: usize,
}

impl Lookup {
    /// True when every segment exists
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing == 0
    }
}

/// Resolves `segments` below `start`, creating missing folders
///
/// # Errors
/// [`SyncError::Auth`] if the store rejects the credentials, otherwise
/// [`SyncError::Remote`] if a listing or folder creation fails.
pub async fn resolve_path<S: AsRef<str>>(
    store: &dyn IRemoteStore,
    start: RemoteNode,
    segments: &[S],
) -> Result<Resolved, SyncError> {
    let mut current = start;
    let mut created = Vec::new();

    for segment in segments {
        let segment = segment.as_ref();

        let existing = if created.is_empty() {
            store
                .list_children(&current.id, ChildFilter::Kind(NodeKind::Folder))
                .await
                .with_context(|| format!("Failed to resolve segment '{segment}'"))?
                .into_iter()
                .find(|child| child.is_folder() && child.name == segment)
        } else {
            None
        };

        current = match existing {
            Some(folder) => {
                debug!(segment, id = %folder.id, "Descending into existing folder");
                folder
            }
            None => {
                let folder = store
                    .create_folder(&current.id, segment)
                    .await
                    .with_context(|| format!("Failed to create folder '{segment}'"))?;
                info!(segment, id = %folder.id, "Created remote folder");
                created.push(folder.clone());
                folder
            }
        };
    }

    Ok(Resolved {
        node: current,
        created,
    })
}

/// Walks `segments` below `start` as far as they exist, creating nothing
///
/// # Errors
/// [`SyncError::Auth`] if the store rejects the credentials, otherwise
/// [`SyncError::Remote`] if a listing fails.
pub async fn lookup_path<S: AsRef<str>>(
    store: &dyn IRemoteStore,
    start: RemoteNode,
    segments: &[S],
) -> Result<Lookup, SyncError> {
    let mut current = start;

    for (depth, segment) in segments.iter().enumerate() {
        let segment = segment.as_ref();
        let found = store
            .list_children(&current.id, ChildFilter::Kind(NodeKind::Folder))
            .await
            .with_context(|| format!("Failed to look up segment '{segment}'"))?
            .into_iter()
            .find(|child| child.is_folder() && child.name == segment);

        match found {
            Some(folder) => current = folder,
            None => {
                debug!(segment, missing = segments.len() - depth, "Remote path does not exist yet");
                return Ok(Lookup {
                    node: current,
                    missing: segments.len() - depth,
                });
            }
        }
    }

    Ok(Lookup {
        node: current,
        missing: 0,
    })
}
