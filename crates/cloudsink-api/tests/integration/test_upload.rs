//! Multipart uploads: routing, body layout and restart-once behavior

use std::path::PathBuf;
use std::sync::Arc;

use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, Request, ResponseTemplate};

use cloudsink_api::upload::{self, MULTIPART_BOUNDARY};
use cloudsink_core::domain::RemoteId;
use cloudsink_core::ports::{UploadRequest, UploadSource, UploadTarget};

use crate::common::{file_node, mount_refresh, setup};

const MD5: &str = "900150983cd24fb0d6963f7d28e17f72";

fn write_source(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("a.jpg");
    std::fs::write(&path, b"abc").unwrap();
    path
}

fn new_file(source: UploadSource) -> UploadRequest {
    UploadRequest {
        source,
        target: UploadTarget::New {
            parent_id: RemoteId::new("p1").unwrap(),
            name: "a.jpg".to_string(),
        },
        content_type: "image/jpeg".to_string(),
    }
}

fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")
}

#[tokio::test]
async fn test_new_file_posts_multipart_with_metadata() {
    let env = setup(Some("token")).await;
    let source = write_source(env.dir.path());

    Mock::given(method("POST"))
        .and(path("/content/nodes"))
        .and(query_param("suppress", "deduplication"))
        .and(header("Content-Type", multipart_content_type().as_str()))
        .and(body_string_contains("name=\"metadata\""))
        .and(body_string_contains("\"parents\":[\"p1\"]"))
        .and(body_string_contains("Content-Type: image/jpeg"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_node("f1", "a.jpg", "p1", MD5)))
        .expect(1)
        .mount(&env.server)
        .await;

    let node = upload::upload(&env.client, &new_file(UploadSource::File(source)))
        .await
        .unwrap();
    assert_eq!(node.id.as_str(), "f1");
    assert_eq!(node.fingerprint.unwrap().as_str(), MD5);

    let requests = env.server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).into_owned();
    let metadata = body.find("name=\"metadata\"").unwrap();
    let content = body.find("name=\"content\"").unwrap();
    assert!(metadata < content);
    assert!(body.contains("\r\n\r\nabc\r\n"));
    assert!(body.ends_with(&format!("--{MULTIPART_BOUNDARY}--\r\n")));
}

#[tokio::test]
async fn test_replacement_puts_content_without_metadata() {
    let env = setup(Some("token")).await;
    let source = write_source(env.dir.path());

    Mock::given(method("PUT"))
        .and(path("/content/nodes/f1/content"))
        .and(body_string_contains("filename=\"a.jpg\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_node("f1", "a.jpg", "p1", MD5)))
        .expect(1)
        .mount(&env.server)
        .await;

    let request = UploadRequest {
        source: UploadSource::File(source),
        target: UploadTarget::Replace {
            node_id: RemoteId::new("f1").unwrap(),
        },
        content_type: "image/jpeg".to_string(),
    };
    upload::upload(&env.client, &request).await.unwrap();

    let requests = env.server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).into_owned();
    assert!(!body.contains("metadata"));
}

#[tokio::test]
async fn test_failed_upload_is_restarted_once() {
    let env = setup(Some("token")).await;
    let source = write_source(env.dir.path());

    Mock::given(method("POST"))
        .and(path("/content/nodes"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/content/nodes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_node("f1", "a.jpg", "p1", MD5)))
        .expect(1)
        .mount(&env.server)
        .await;

    let node = upload::upload(&env.client, &new_file(UploadSource::File(source)))
        .await
        .unwrap();
    assert_eq!(node.id.as_str(), "f1");
}

#[tokio::test]
async fn test_upload_gives_up_after_second_failure() {
    let env = setup(Some("token")).await;
    let source = write_source(env.dir.path());

    Mock::given(method("POST"))
        .and(path("/content/nodes"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&env.server)
        .await;

    let err = upload::upload(&env.client, &new_file(UploadSource::File(source)))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_401_on_streamed_upload_restarts_from_fresh_file() {
    let env = setup(Some("stale-token")).await;
    let source = write_source(env.dir.path());
    mount_refresh(&env.server, "fresh-token", 1).await;

    Mock::given(method("POST"))
        .and(path("/content/nodes"))
        .and(header("Authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/content/nodes"))
        .and(header("Authorization", "Bearer fresh-token"))
        .respond_with(|req: &Request| {
            // The restarted attempt must carry the whole file again
            let body = String::from_utf8_lossy(&req.body);
            if body.contains("\r\n\r\nabc\r\n") {
                ResponseTemplate::new(201).set_body_json(file_node("f1", "a.jpg", "p1", MD5))
            } else {
                ResponseTemplate::new(400)
            }
        })
        .expect(1)
        .mount(&env.server)
        .await;

    let node = upload::upload(&env.client, &new_file(UploadSource::File(source)))
        .await
        .unwrap();
    assert_eq!(node.id.as_str(), "f1");
}

#[tokio::test]
async fn test_buffer_upload_is_replayed_after_401() {
    let env = setup(Some("stale-token")).await;
    mount_refresh(&env.server, "fresh-token", 1).await;

    Mock::given(method("POST"))
        .and(path("/content/nodes"))
        .and(header("Authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/content/nodes"))
        .and(header("Authorization", "Bearer fresh-token"))
        .and(body_string_contains("\r\n\r\nabc\r\n"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_node("f1", "a.jpg", "p1", MD5)))
        .expect(1)
        .mount(&env.server)
        .await;

    let source = UploadSource::Buffer(Arc::from(&b"abc"[..]));
    let node = upload::upload(&env.client, &new_file(source)).await.unwrap();
    assert_eq!(node.name, "a.jpg");
}

#[tokio::test]
async fn test_missing_source_file_fails_after_restart() {
    let env = setup(Some("token")).await;
    let missing = env.dir.path().join("gone.jpg");

    let err = upload::upload(&env.client, &new_file(UploadSource::File(missing)))
        .await
        .unwrap_err();
    assert!(matches!(err, cloudsink_api::ApiError::Io(_)));
}

#[tokio::test]
async fn test_second_401_after_restart_surfaces_without_another_refresh() {
    let env = setup(Some("stale-token")).await;
    let source = write_source(env.dir.path());
    mount_refresh(&env.server, "fresh-token", 1).await;

    Mock::given(method("POST"))
        .and(path("/content/nodes"))
        .respond_with(ResponseTemplate::new(401).set_body_string("still expired"))
        .expect(2)
        .mount(&env.server)
        .await;

    let err = upload::upload(&env.client, &new_file(UploadSource::File(source)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        cloudsink_api::ApiError::Request { status: 401, .. }
    ));
    assert!(err.is_unauthorized());

    let requests = env.server.received_requests().await.unwrap();
    let restarted = requests
        .iter()
        .filter(|r| r.url.path() == "/content/nodes")
        .nth(1)
        .unwrap();
    assert_eq!(
        restarted.headers.get("Authorization").unwrap().to_str().unwrap(),
        "Bearer fresh-token"
    );
}

#[tokio::test]
async fn test_rejected_token_exchange_is_not_restarted() {
    let env = setup(Some("stale-token")).await;
    let source = write_source(env.dir.path());

    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/content/nodes"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&env.server)
        .await;

    let err = upload::upload(&env.client, &new_file(UploadSource::File(source)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        cloudsink_api::ApiError::Auth { status: 400, .. }
    ));
}
