//! Upload pipeline
//!
//! Sends a file (or in-memory buffer) to the content endpoint as a single
//! multipart body:
//! - New file: `POST nodes?suppress=deduplication`, with a JSON metadata part
//!   `{name, kind: FILE, parents: [parentId]}` followed by the content part
//! - Replacement: `PUT nodes/{id}/content`, with the content part only
//!
//! File content is streamed from disk, never buffered whole. Because a
//! streamed body can be sent only once, the whole logical upload is retried
//! once from a freshly opened file, including after the
//! [`ApiError::StreamExhausted`] produced by a 401 mid-upload. That restart
//! reuses the token refreshed by the first attempt, so a second 401 surfaces
//! as [`ApiError::Request`] instead of starting another refresh. Credential
//! failures ([`ApiError::is_unauthorized`]) are returned without a restart.

use std::io;
use std::path::Path;

use bytes::Bytes;
use cloudsink_core::domain::{NodeKind, RemoteNode};
use cloudsink_core::ports::{UploadRequest, UploadSource, UploadTarget};
use futures_util::stream::{self, StreamExt};
use reqwest::Method;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::client::{ApiClient, Endpoint, RequestBody, RequestSpec};
use crate::nodes::WireNode;
use crate::ApiError;

/// Multipart boundary sent to the content endpoint
pub const MULTIPART_BOUNDARY: &str = "WebKitFormBoundaryE19zNvXGzXaLvS5C";

/// Attempts per logical upload: the first try plus one restart
pub const UPLOAD_ATTEMPTS: u32 = 2;

/// Uploads content, retrying the whole upload once from a fresh source
///
/// # Errors
/// - The credential error at once when [`ApiError::is_unauthorized`] holds
/// - Otherwise the error of the last attempt when both attempts fail
pub async fn upload(client: &ApiClient, request: &UploadRequest) -> Result<RemoteNode, ApiError> {
    let mut attempt = 1;
    let mut allow_refresh = true;
    loop {
        match upload_once(client, request, allow_refresh).await {
            Ok(node) => {
                if attempt > 1 {
                    info!(id = %node.id, attempt, "Upload succeeded after restart");
                }
                return Ok(node);
            }
            Err(err) if err.is_unauthorized() => return Err(err),
            Err(err) if attempt < UPLOAD_ATTEMPTS => {
                warn!(
                    attempt,
                    restart_required = err.requires_restart(),
                    error = %err,
                    "Upload failed, restarting from a fresh source"
                );
                // StreamExhausted means the token was already refreshed once
                allow_refresh = !err.requires_restart();
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// One upload attempt with a freshly built body
async fn upload_once(
    client: &ApiClient,
    request: &UploadRequest,
    allow_refresh: bool,
) -> Result<RemoteNode, ApiError> {
    let (mut spec, metadata, filename) = match &request.target {
        UploadTarget::New { parent_id, name } => (
            RequestSpec::new(Method::POST, Endpoint::Content, "/nodes")
                .query("suppress", "deduplication"),
            Some(serde_json::json!({
                "name": name,
                "kind": NodeKind::File.as_str(),
                "parents": [parent_id.as_str()],
            })),
            name.clone(),
        ),
        UploadTarget::Replace { node_id } => (
            RequestSpec::new(
                Method::PUT,
                Endpoint::Content,
                format!("/nodes/{}/content", node_id.as_str()),
            ),
            None,
            source_filename(&request.source),
        ),
    };

    if !allow_refresh {
        spec = spec.without_refresh();
    }

    let head = multipart_head(metadata.as_ref(), &filename, &request.content_type);
    let tail = multipart_tail();
    let content_type = format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}");

    let body = match &request.source {
        UploadSource::File(path) => {
            let file = tokio::fs::File::open(path).await?;
            debug!(path = %path.display(), replace = request.target.is_replace(), "Streaming upload");
            let parts = stream::iter([Ok::<Bytes, io::Error>(Bytes::from(head))])
                .chain(ReaderStream::new(file))
                .chain(stream::iter([Ok(Bytes::from(tail))]));
            RequestBody::stream(content_type, reqwest::Body::wrap_stream(parts))
        }
        UploadSource::Buffer(data) => {
            debug!(bytes = data.len(), replace = request.target.is_replace(), "Uploading buffer");
            let mut buf = Vec::with_capacity(head.len() + data.len() + tail.len());
            buf.extend_from_slice(head.as_bytes());
            buf.extend_from_slice(data);
            buf.extend_from_slice(tail.as_bytes());
            RequestBody::Bytes {
                content_type,
                data: Bytes::from(buf),
            }
        }
    };

    let node: WireNode = client.execute_json(&spec, body).await?;
    RemoteNode::try_from(node)
}

/// Everything before the content bytes: optional metadata part and the
/// content part headers
fn multipart_head(
    metadata: Option<&serde_json::Value>,
    filename: &str,
    content_type: &str,
) -> String {
    let mut head = String::new();
    if let Some(metadata) = metadata {
        head.push_str(&format!("--{MULTIPART_BOUNDARY}\r\n"));
        head.push_str("Content-Disposition: form-data; name=\"metadata\"\r\n\r\n");
        head.push_str(&metadata.to_string());
        head.push_str("\r\n");
    }
    head.push_str(&format!("--{MULTIPART_BOUNDARY}\r\n"));
    head.push_str(&format!(
        "Content-Disposition: form-data; name=\"content\"; filename=\"{}\"\r\n",
        escape_filename(filename)
    ));
    head.push_str(&format!("Content-Type: {content_type}\r\n\r\n"));
    head
}

fn multipart_tail() -> String {
    format!("\r\n--{MULTIPART_BOUNDARY}--\r\n")
}

fn escape_filename(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| if c == '"' { '\'' } else { c })
        .collect()
}

fn source_filename(source: &UploadSource) -> String {
    match source {
        UploadSource::File(path) => Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "content".to_string()),
        UploadSource::Buffer(_) => "content".to_string(),
    }
}
