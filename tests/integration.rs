//! Integration tests for the sessiond HTTP API.
//!
//! Each test spins up a server on an ephemeral port with its own temporary
//! session directory.

use sessiond::{
    auth::{AppState, SessionManager},
    middleware::security_headers,
    routes,
    storage::{SessionStore, UserStore},
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const USERS: &str = r#"[
    {"name": "alice", "password": "pw", "admin": false},
    {"name": "bob", "password": "builder", "admin": true}
]"#;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    _dir: TempDir,
}

/// Spin up a test server backed by `session_dir`, recovering whatever is
/// already stored there.
async fn spawn_server_at(session_dir: &Path, ttl: chrono::TimeDelta) -> (String, reqwest::Client) {
    let users = UserStore::from_json(USERS).expect("Failed to parse users");
    let store = SessionStore::open(session_dir)
        .await
        .expect("Failed to open session store");
    store.load_all(&users).await.expect("Failed to load sessions");

    let state = AppState {
        sessions: Arc::new(SessionManager::new(
            Arc::new(users),
            Arc::new(store),
            ttl,
        )),
    };

    let app = routes::api_router()
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), reqwest::Client::new())
}

async fn spawn_test_server(ttl: chrono::TimeDelta) -> TestServer {
    let dir = TempDir::new().unwrap();
    let (base_url, client) = spawn_server_at(dir.path(), ttl).await;
    TestServer {
        base_url,
        client,
        _dir: dir,
    }
}

/// Extract the session token from a response's `Set-Cookie` header.
fn token_from(resp: &reqwest::Response) -> String {
    let cookie = resp
        .headers()
        .get("set-cookie")
        .expect("Missing Set-Cookie")
        .to_str()
        .unwrap();
    let pair = cookie.split(';').next().unwrap();
    pair.strip_prefix("session_token=")
        .expect("Unexpected cookie name")
        .to_string()
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, name: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/session/login"))
            .form(&[("name", name), ("password", password)])
            .send()
            .await
            .expect("Failed to send request")
    }

    async fn with_token(&self, method: reqwest::Method, path: &str, token: &str) -> reqwest::Response {
        self.client
            .request(method, self.url(path))
            .header("cookie", format!("session_token={}", token))
            .send()
            .await
            .expect("Failed to send request")
    }

    async fn status(&self, token: &str) -> reqwest::Response {
        self.with_token(reqwest::Method::GET, "/session/status", token)
            .await
    }
}

// ============================================================================
// Login / Status
// ============================================================================

#[tokio::test]
async fn test_login_then_status() {
    let server = spawn_test_server(chrono::TimeDelta::minutes(1)).await;

    let resp = server.login("alice", "pw").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("cache-control").unwrap(), "no-store");

    let cookie = resp.headers().get("set-cookie").unwrap().to_str().unwrap();
    assert!(cookie.contains("Expires="));
    assert!(cookie.contains("HttpOnly"));
    let token = token_from(&resp);
    assert!(!token.is_empty());

    let resp = server.status(&token).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["user"], "alice");
    assert!(body["expiry"].as_str().is_some());
}

#[tokio::test]
async fn test_login_with_json_body_and_username_alias() {
    let server = spawn_test_server(chrono::TimeDelta::minutes(1)).await;

    let resp = server
        .client
        .post(server.url("/session/login"))
        .json(&serde_json::json!({"username": "bob", "password": "builder"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let token = token_from(&resp);
    let body: serde_json::Value = server.status(&token).await.json().await.unwrap();
    assert_eq!(body["user"], "bob");
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let server = spawn_test_server(chrono::TimeDelta::minutes(1)).await;

    let wrong_password = server.login("alice", "wrong").await;
    assert_eq!(wrong_password.status(), 401);
    assert!(wrong_password.headers().get("set-cookie").is_none());
    let wrong_password: serde_json::Value = wrong_password.json().await.unwrap();

    let unknown_user = server.login("mallory", "pw").await;
    assert_eq!(unknown_user.status(), 401);
    let unknown_user: serde_json::Value = unknown_user.json().await.unwrap();

    // Same answer whichever half was wrong
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn test_login_missing_fields() {
    let server = spawn_test_server(chrono::TimeDelta::minutes(1)).await;

    let resp = server
        .client
        .post(server.url("/session/login"))
        .form(&[("name", "alice")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 406);

    let resp = server
        .client
        .post(server.url("/session/login"))
        .header("content-type", "application/json")
        .body("{broken")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 406);
}

#[tokio::test]
async fn test_status_without_cookie() {
    let server = spawn_test_server(chrono::TimeDelta::minutes(1)).await;

    let resp = server
        .client
        .get(server.url("/session/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_status_unknown_token() {
    let server = spawn_test_server(chrono::TimeDelta::minutes(1)).await;

    let resp = server.status("not-a-real-token").await;
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_session_expires() {
    let server = spawn_test_server(chrono::TimeDelta::milliseconds(200)).await;

    let token = token_from(&server.login("alice", "pw").await);
    assert_eq!(server.status(&token).await.status(), 200);

    tokio::time::sleep(std::time::Duration::from_millis(400)).await;

    assert_eq!(server.status(&token).await.status(), 401);
    assert_eq!(server.status(&token).await.status(), 401);
}

// ============================================================================
// Refresh / Logout
// ============================================================================

#[tokio::test]
async fn test_refresh_rotates_cookie() {
    let server = spawn_test_server(chrono::TimeDelta::minutes(1)).await;

    let old = token_from(&server.login("alice", "pw").await);

    let resp = server
        .with_token(reqwest::Method::POST, "/session/refresh", &old)
        .await;
    assert_eq!(resp.status(), 200);
    let new = token_from(&resp);
    assert_ne!(old, new);

    assert_eq!(server.status(&old).await.status(), 401);
    let resp = server.status(&new).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["user"], "alice");

    // The old token can't be refreshed again
    let resp = server
        .with_token(reqwest::Method::POST, "/session/refresh", &old)
        .await;
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_logout_clears_cookie_and_is_idempotent() {
    let server = spawn_test_server(chrono::TimeDelta::minutes(1)).await;

    let token = token_from(&server.login("alice", "pw").await);

    let resp = server
        .with_token(reqwest::Method::POST, "/session/logout", &token)
        .await;
    assert_eq!(resp.status(), 200);
    let cookie = resp.headers().get("set-cookie").unwrap().to_str().unwrap();
    assert!(cookie.starts_with("session_token=;"));
    assert!(cookie.contains("Max-Age=0"));

    assert_eq!(server.status(&token).await.status(), 401);

    let resp = server
        .with_token(reqwest::Method::POST, "/session/logout", &token)
        .await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_logout_without_cookie() {
    let server = spawn_test_server(chrono::TimeDelta::minutes(1)).await;

    let resp = server
        .client
        .post(server.url("/session/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_malformed_cookie() {
    let server = spawn_test_server(chrono::TimeDelta::minutes(1)).await;

    let resp = server
        .client
        .post(server.url("/session/logout"))
        .header("cookie", "session_token=\"bad value\"")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_path_like_token_is_just_unknown() {
    let dir = TempDir::new().unwrap();
    let session_dir = dir.path().join("sessions");
    let outside = dir.path().join("keep.txt");
    std::fs::write(&outside, "important").unwrap();

    let (base_url, client) = spawn_server_at(&session_dir, chrono::TimeDelta::minutes(1)).await;

    let resp = client
        .post(format!("{}/session/logout", base_url))
        .header("cookie", "session_token=../keep.txt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(outside.exists());
}

// ============================================================================
// List / Restart
// ============================================================================

#[tokio::test]
async fn test_list_live_sessions() {
    let server = spawn_test_server(chrono::TimeDelta::minutes(1)).await;

    server.login("alice", "pw").await;
    server.login("bob", "builder").await;

    let resp = server
        .client
        .get(server.url("/session/list"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    for entry in entries {
        assert!(entry["user"].is_string());
        assert!(entry["expiry"].is_string());
        assert_eq!(entry.as_object().unwrap().len(), 2);
    }
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = TempDir::new().unwrap();

    let token = {
        let (base_url, client) = spawn_server_at(dir.path(), chrono::TimeDelta::minutes(5)).await;
        let resp = client
            .post(format!("{}/session/login", base_url))
            .form(&[("name", "alice"), ("password", "pw")])
            .send()
            .await
            .unwrap();
        token_from(&resp)
    };

    // A second server over the same directory plays the restarted process
    let (base_url, client) = spawn_server_at(dir.path(), chrono::TimeDelta::minutes(5)).await;
    let resp = client
        .get(format!("{}/session/status", base_url))
        .header("cookie", format!("session_token={}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["user"], "alice");
}
