//! Token refresh and 401 retry behavior of the request layer

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use cloudsink_api::nodes;
use cloudsink_api::ApiError;
use cloudsink_core::domain::RemoteId;
use cloudsink_core::ports::ChildFilter;

use crate::common::{mount_refresh, setup, REFRESH_TOKEN};

fn parent() -> RemoteId {
    RemoteId::new("folder-1").unwrap()
}

#[tokio::test]
async fn test_401_refreshes_once_and_retries() {
    let env = setup(Some("stale-token")).await;

    Mock::given(method("GET"))
        .and(path("/nodes/folder-1/children"))
        .and(header("Authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/nodes/folder-1/children"))
        .and(header("Authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .and(body_string_contains(format!("refresh_token={REFRESH_TOKEN}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&env.server)
        .await;

    let children = nodes::list_children(&env.client, &parent(), ChildFilter::All)
        .await
        .unwrap();
    assert!(children.is_empty());

    let persisted = std::fs::read_to_string(env.token_file()).unwrap();
    assert!(persisted.contains("fresh-token"));
}

#[tokio::test]
async fn test_second_401_is_fatal() {
    let env = setup(Some("stale-token")).await;

    Mock::given(method("GET"))
        .and(path("/nodes/folder-1/children"))
        .respond_with(ResponseTemplate::new(401).set_body_string("still unauthorized"))
        .expect(2)
        .mount(&env.server)
        .await;
    mount_refresh(&env.server, "fresh-token", 1).await;

    let err = nodes::list_children(&env.client, &parent(), ChildFilter::All)
        .await
        .unwrap_err();
    match err {
        ApiError::Request { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "still unauthorized");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rejected_exchange_is_auth_error() {
    let env = setup(None).await;

    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/nodes/folder-1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .expect(0)
        .mount(&env.server)
        .await;

    let err = nodes::list_children(&env.client, &parent(), ChildFilter::All)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Auth { status: 400, .. }));
    assert!(!env.token_file().exists());
}

#[tokio::test]
async fn test_missing_token_file_triggers_exchange_and_persists() {
    let env = setup(None).await;
    mount_refresh(&env.server, "fresh-token", 1).await;

    Mock::given(method("GET"))
        .and(path("/nodes/folder-1/children"))
        .and(header("Authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .expect(2)
        .mount(&env.server)
        .await;

    // Second call reuses the in-memory token without another exchange
    for _ in 0..2 {
        nodes::list_children(&env.client, &parent(), ChildFilter::All)
            .await
            .unwrap();
    }

    let persisted = std::fs::read_to_string(env.token_file()).unwrap();
    assert!(persisted.contains('\n'), "token file should be pretty-printed");
    let value: serde_json::Value = serde_json::from_str(&persisted).unwrap();
    assert_eq!(value["access_token"], "fresh-token");
    assert_eq!(value["token_type"], "bearer");
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let env = setup(Some("good-token")).await;

    Mock::given(method("GET"))
        .and(path("/nodes/folder-1/children"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&env.server)
        .await;
    mount_refresh(&env.server, "unused", 0).await;

    let err = nodes::list_children(&env.client, &parent(), ChildFilter::All)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_explicit_refresh_overwrites_token_file() {
    let env = setup(Some("old-token")).await;
    mount_refresh(&env.server, "new-token", 1).await;

    let token = env.client.tokens().refresh().await.unwrap();
    assert_eq!(token, "new-token");
    assert_eq!(
        env.client.tokens().auth_header(false).await.unwrap(),
        "Bearer new-token"
    );

    let persisted = std::fs::read_to_string(env.token_file()).unwrap();
    assert!(persisted.contains("new-token"));
}
