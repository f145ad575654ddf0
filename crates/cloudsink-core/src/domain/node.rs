//! Remote store nodes
//!
//! A [`RemoteNode`] is a FOLDER or FILE living in the remote store, as
//! reported by a listing, folder-creation or upload call. Nodes are fetched
//! per folder during a run and never cached across runs.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{Fingerprint, RemoteId};

/// Kind of a remote node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    Folder,
    File,
}

impl NodeKind {
    /// Wire representation used by the remote store (`FOLDER` / `FILE`)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Folder => "FOLDER",
            NodeKind::File => "FILE",
        }
    }

    /// Kind expected for a local entry, given whether it is a directory
    #[must_use]
    pub const fn for_local(is_directory: bool) -> Self {
        if is_directory {
            NodeKind::Folder
        } else {
            NodeKind::File
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FOLDER" => Ok(NodeKind::Folder),
            "FILE" => Ok(NodeKind::File),
            other => Err(DomainError::UnknownNodeKind(other.to_string())),
        }
    }
}

/// A folder or file in the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNode {
    /// Remote-assigned identifier
    pub id: RemoteId,
    /// Node name, unique only by convention within a parent
    pub name: String,
    /// FOLDER or FILE
    pub kind: NodeKind,
    /// IDs of the folders containing this node
    pub parent_ids: Vec<RemoteId>,
    /// Content digest reported by the store (FILE nodes only, may be absent)
    pub fingerprint: Option<Fingerprint>,
    /// Content size in bytes, when reported
    pub size: Option<u64>,
}

impl RemoteNode {
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}
