//! Metadata endpoint operations
//!
//! Children listing with cursor pagination, root discovery, folder creation
//! and child removal, plus the mapping from wire JSON to [`RemoteNode`].
//!
//! ## Wire format
//!
//! ```json
//! {
//!   "data": [
//!     { "id": "abc", "name": "a.jpg", "kind": "FILE", "parents": ["root"],
//!       "contentProperties": { "md5": "d41d8cd98f00b204e9800998ecf8427e", "size": 0 } }
//!   ],
//!   "nextToken": "cursor-2"
//! }
//! ```

use cloudsink_core::domain::{Fingerprint, NodeKind, RemoteId, RemoteNode};
use cloudsink_core::ports::ChildFilter;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::{ApiClient, Endpoint, RequestBody, RequestSpec};
use crate::ApiError;

// ============================================================================
// Wire types
// ============================================================================

/// A node as returned by the metadata and content endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireNode {
    id: String,
    /// Absent for the root node
    name: Option<String>,
    kind: String,
    #[serde(default)]
    parents: Vec<String>,
    content_properties: Option<ContentProperties>,
}

#[derive(Debug, Deserialize)]
struct ContentProperties {
    md5: Option<String>,
    size: Option<u64>,
}

/// One page of a listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodePage {
    #[serde(default)]
    data: Vec<WireNode>,
    next_token: Option<String>,
}

impl TryFrom<WireNode> for RemoteNode {
    type Error = ApiError;

    fn try_from(node: WireNode) -> Result<Self, Self::Error> {
        let kind: NodeKind = node
            .kind
            .parse()
            .map_err(|e| ApiError::InvalidResponse(format!("node {}: {e}", node.id)))?;
        let id = RemoteId::new(node.id).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        let parent_ids = node
            .parents
            .into_iter()
            .filter_map(|p| RemoteId::new(p).ok())
            .collect();

        let (fingerprint, size) = match node.content_properties {
            Some(props) => {
                let fingerprint = props.md5.and_then(|md5| match Fingerprint::new(&md5) {
                    Ok(fp) => Some(fp),
                    Err(e) => {
                        warn!(node = %id, error = %e, "Ignoring unparseable remote md5");
                        None
                    }
                });
                (fingerprint, props.size)
            }
            None => (None, None),
        };

        Ok(RemoteNode {
            id,
            name: node.name.unwrap_or_default(),
            kind,
            parent_ids,
            fingerprint,
            size,
        })
    }
}

/// Converts a page of wire nodes, dropping kinds the sync does not model
fn convert_page(nodes: Vec<WireNode>, out: &mut Vec<RemoteNode>) -> Result<(), ApiError> {
    for node in nodes {
        if node.kind.parse::<NodeKind>().is_err() {
            debug!(id = %node.id, kind = %node.kind, "Skipping node of unsupported kind");
            continue;
        }
        out.push(RemoteNode::try_from(node)?);
    }
    Ok(())
}

// ============================================================================
// Operations
// ============================================================================

/// Lists all children of `parent`, following `nextToken` cursors
///
/// Pages are concatenated in arrival order; a listing of K pages costs
/// K requests.
pub async fn list_children(
    client: &ApiClient,
    parent: &RemoteId,
    filter: ChildFilter,
) -> Result<Vec<RemoteNode>, ApiError> {
    let path = format!("/nodes/{}/children", parent.as_str());
    let mut children = Vec::new();
    let mut cursor: Option<String> = None;
    let mut page_count: u32 = 0;

    loop {
        let mut spec = RequestSpec::new(Method::GET, Endpoint::Metadata, path.as_str());
        if let Some(filter) = filter.as_query() {
            spec = spec.query("filters", filter);
        }
        if let Some(token) = cursor.take() {
            spec = spec.query("startToken", token);
        }

        let page: NodePage = client.execute_json(&spec, RequestBody::Empty).await?;
        page_count += 1;

        debug!(
            parent = %parent,
            page = page_count,
            items = page.data.len(),
            has_next = page.next_token.is_some(),
            "Received children page"
        );

        convert_page(page.data, &mut children)?;

        match page.next_token {
            Some(token) if !token.is_empty() => cursor = Some(token),
            _ => break,
        }
    }

    debug!(
        parent = %parent,
        total_items = children.len(),
        total_pages = page_count,
        "Children listing complete"
    );
    Ok(children)
}

/// Finds the root folder (`GET nodes?filters=isRoot:true`)
pub async fn root(client: &ApiClient) -> Result<RemoteNode, ApiError> {
    let spec = RequestSpec::new(Method::GET, Endpoint::Metadata, "/nodes")
        .query("filters", "isRoot:true");
    let page: NodePage = client.execute_json(&spec, RequestBody::Empty).await?;

    let node = page
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::InvalidResponse("root query returned no node".to_string()))?;
    let root = RemoteNode::try_from(node)?;
    debug!(id = %root.id, "Discovered root node");
    Ok(root)
}

/// Creates a folder named `name` under `parent`
pub async fn create_folder(
    client: &ApiClient,
    parent: &RemoteId,
    name: &str,
) -> Result<RemoteNode, ApiError> {
    let spec = RequestSpec::new(Method::POST, Endpoint::Metadata, "/nodes");
    let body = serde_json::json!({
        "name": name,
        "kind": NodeKind::Folder.as_str(),
        "parents": [parent.as_str()],
    });

    let node: WireNode = client.execute_json(&spec, RequestBody::Json(body)).await?;
    let node = RemoteNode::try_from(node)?;
    debug!(parent = %parent, name, id = %node.id, "Created remote folder");
    Ok(node)
}

/// Detaches `child` from `parent` (`DELETE nodes/{parent}/children/{child}`)
pub async fn remove_child(
    client: &ApiClient,
    parent: &RemoteId,
    child: &RemoteId,
) -> Result<(), ApiError> {
    let path = format!("/nodes/{}/children/{}", parent.as_str(), child.as_str());
    let spec = RequestSpec::new(Method::DELETE, Endpoint::Metadata, path);
    client.execute(&spec, RequestBody::Empty).await?;
    debug!(parent = %parent, child = %child, "Removed remote child");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
