//! Shared test helpers for remote store integration tests
//!
//! Provides wiremock-based mock server setup. The metadata endpoint lives at
//! the server root, the content endpoint under `/content` and the token
//! exchange at `/refresh`.

use std::path::PathBuf;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cloudsink_api::auth::TokenSettings;
use cloudsink_api::client::ApiClient;

pub const REFRESH_TOKEN: &str = "test-refresh-token";

/// Mock server plus a client pointing at it
///
/// The temp dir holds the token file and must outlive the client.
pub struct TestEnv {
    pub server: MockServer,
    pub client: ApiClient,
    pub dir: TempDir,
}

impl TestEnv {
    pub fn token_file(&self) -> PathBuf {
        self.dir.path().join("token.json")
    }
}

/// Starts a mock server; when `access_token` is given it is written to the
/// token file so requests start authenticated without an exchange.
pub async fn setup(access_token: Option<&str>) -> TestEnv {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let token_file = dir.path().join("token.json");

    if let Some(token) = access_token {
        std::fs::write(
            &token_file,
            serde_json::json!({ "access_token": token }).to_string(),
        )
        .expect("write token file");
    }

    let client = ApiClient::new(
        server.uri(),
        format!("{}/content", server.uri()),
        TokenSettings {
            refresh_url: format!("{}/refresh", server.uri()),
            refresh_token: Some(REFRESH_TOKEN.to_string()),
            token_file,
        },
    );

    TestEnv {
        server,
        client,
        dir,
    }
}

/// Mounts a token exchange that hands out `access_token`, expected `times` times
pub async fn mount_refresh(server: &MockServer, access_token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// JSON for a file node
pub fn file_node(id: &str, name: &str, parent: &str, md5: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "kind": "FILE",
        "parents": [parent],
        "contentProperties": { "md5": md5, "size": 3 }
    })
}

/// JSON for a folder node
pub fn folder_node(id: &str, name: &str, parent: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "kind": "FOLDER",
        "parents": [parent]
    })
}
