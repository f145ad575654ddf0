//! In-memory remote store for driver and resolver tests

use std::collections::HashSet;
use std::sync::Mutex;

use md5::{Digest, Md5};

use cloudsink_core::domain::{Fingerprint, NodeKind, RemoteId, RemoteNode};
use cloudsink_core::ports::{
    ChildFilter, IRemoteStore, RemoteError, UploadRequest, UploadSource, UploadTarget,
};

/// A recorded call against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    CreateFolder { parent: String, name: String },
    UploadNew { parent: String, name: String, content_type: String },
    Replace { id: String },
    Remove { parent: String, child: String },
}

/// Operations that can be made to fail with rejected credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    CreateFolder,
    Upload,
}

#[derive(Default)]
pub struct MemoryStore {
    nodes: Mutex<Vec<RemoteNode>>,
    calls: Mutex<Vec<Call>>,
    failing_uploads: Mutex<HashSet<String>>,
    revoked: Mutex<HashSet<Op>>,
    next_id: Mutex<u32>,
}

pub const ROOT_ID: &str = "root";

impl MemoryStore {
    pub fn new() -> Self {
        let store = Self::default();
        store.nodes.lock().unwrap().push(RemoteNode {
            id: RemoteId::new(ROOT_ID).unwrap(),
            name: String::new(),
            kind: NodeKind::Folder,
            parent_ids: Vec::new(),
            fingerprint: None,
            size: None,
        });
        store
    }

    /// Adds a node under `parent` and returns it
    pub fn add(&self, parent: &str, name: &str, kind: NodeKind, md5: Option<&str>) -> RemoteNode {
        let node = RemoteNode {
            id: self.fresh_id(),
            name: name.to_string(),
            kind,
            parent_ids: vec![RemoteId::new(parent).unwrap()],
            fingerprint: md5.map(|m| Fingerprint::new(m).unwrap()),
            size: None,
        };
        self.nodes.lock().unwrap().push(node.clone());
        node
    }

    /// Makes every upload of a file with this name fail
    pub fn fail_uploads_of(&self, name: &str) {
        self.failing_uploads.lock().unwrap().insert(name.to_string());
    }

    /// Makes every later `op` fail as unauthorized
    pub fn revoke(&self, op: Op) {
        self.revoked.lock().unwrap().insert(op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Calls that change remote state
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::List(_)))
            .collect()
    }

    pub fn node(&self, id: &RemoteId) -> Option<RemoteNode> {
        self.nodes.lock().unwrap().iter().find(|n| &n.id == id).cloned()
    }

    pub fn root_node(&self) -> RemoteNode {
        self.node(&RemoteId::new(ROOT_ID).unwrap()).unwrap()
    }

    pub fn child(&self, parent: &str, name: &str) -> Option<RemoteNode> {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.name == name && n.parent_ids.iter().any(|p| p.as_str() == parent))
            .cloned()
    }

    fn fresh_id(&self) -> RemoteId {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        RemoteId::new(format!("n{next}")).unwrap()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn authorize(&self, op: Op) -> anyhow::Result<()> {
        if self.revoked.lock().unwrap().contains(&op) {
            let cause = std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "Token exchange failed with status 400: invalid_grant",
            );
            return Err(RemoteError::unauthorized(cause).into());
        }
        Ok(())
    }
}

fn digest(source: &UploadSource) -> Fingerprint {
    let data = match source {
        UploadSource::File(path) => std::fs::read(path).unwrap(),
        UploadSource::Buffer(data) => data.to_vec(),
    };
    Fingerprint::new(hex::encode(Md5::digest(&data))).unwrap()
}

#[async_trait::async_trait]
impl IRemoteStore for MemoryStore {
    async fn root(&self) -> anyhow::Result<RemoteNode> {
        Ok(self.root_node())
    }

    async fn list_children(
        &self,
        parent: &RemoteId,
        filter: ChildFilter,
    ) -> anyhow::Result<Vec<RemoteNode>> {
        self.record(Call::List(parent.to_string()));
        self.authorize(Op::List)?;
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.parent_ids.contains(parent) && filter.matches(n))
            .cloned()
            .collect())
    }

    async fn create_folder(&self, parent: &RemoteId, name: &str) -> anyhow::Result<RemoteNode> {
        self.record(Call::CreateFolder {
            parent: parent.to_string(),
            name: name.to_string(),
        });
        self.authorize(Op::CreateFolder)?;
        Ok(self.add(parent.as_str(), name, NodeKind::Folder, None))
    }

    async fn upload(&self, request: UploadRequest) -> anyhow::Result<RemoteNode> {
        let revoked = self.authorize(Op::Upload);
        match &request.target {
            UploadTarget::New { parent_id, name } => {
                self.record(Call::UploadNew {
                    parent: parent_id.to_string(),
                    name: name.clone(),
                    content_type: request.content_type.clone(),
                });
                revoked?;
                if self.failing_uploads.lock().unwrap().contains(name) {
                    anyhow::bail!("Request failed with status 500: injected");
                }
                let md5 = digest(&request.source);
                Ok(self.add(parent_id.as_str(), name, NodeKind::File, Some(md5.as_str())))
            }
            UploadTarget::Replace { node_id } => {
                self.record(Call::Replace {
                    id: node_id.to_string(),
                });
                revoked?;
                let md5 = digest(&request.source);
                let mut nodes = self.nodes.lock().unwrap();
                let node = nodes
                    .iter_mut()
                    .find(|n| &n.id == node_id)
                    .ok_or_else(|| anyhow::anyhow!("no node {node_id}"))?;
                if self.failing_uploads.lock().unwrap().contains(&node.name) {
                    anyhow::bail!("Request failed with status 500: injected");
                }
                node.fingerprint = Some(md5);
                Ok(node.clone())
            }
        }
    }

    async fn remove_child(&self, parent: &RemoteId, child: &RemoteId) -> anyhow::Result<()> {
        self.record(Call::Remove {
            parent: parent.to_string(),
            child: child.to_string(),
        });
        self.nodes
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|n| &n.id == child)
            .for_each(|n| n.parent_ids.retain(|p| p != parent));
        Ok(())
    }
}

#[tokio::test]
async fn test_memory_store_remove_child_detaches() {
    let store = MemoryStore::new();
    let file = store.add(ROOT_ID, "a.jpg", NodeKind::File, None);
    let root = store.root_node();

    store.remove_child(&root.id, &file.id).await.unwrap();
    let children = store.list_children(&root.id, ChildFilter::All).await.unwrap();
    assert!(children.is_empty());
}
