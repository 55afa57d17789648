//! Integration tests for startup validation, login and logout.

use std::sync::Arc;
use std::time::Duration;

use gdprdesk_core::auth::{AuthError, AuthState, FileTokenStore, MemoryTokenStore, TokenStore};
use gdprdesk_core::models::ResourceId;
use gdprdesk_core::{connect, SessionStore};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =========================================================================
// Helpers
// =========================================================================

fn api_url(server: &MockServer) -> String {
    format!("{}/api/", server.uri())
}

fn store_with(server: &MockServer, token: Option<&str>) -> (SessionStore, Arc<MemoryTokenStore>) {
    let tokens = Arc::new(match token {
        Some(t) => MemoryTokenStore::with_token(t),
        None => MemoryTokenStore::new(),
    });
    let store = connect(&api_url(server), tokens.clone()).expect("client builds");
    (store, tokens)
}

/// Nothing listens on port 1, so every request fails without a response.
const UNREACHABLE_URL: &str = "http://127.0.0.1:1/api/";

// =========================================================================
// initialize()
// =========================================================================

#[tokio::test]
async fn initialize_without_token_skips_validation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(0)
        .mount(&server)
        .await;

    let (store, _) = store_with(&server, None);
    assert_eq!(store.state(), AuthState::Loading);

    assert_eq!(store.initialize().await, AuthState::Anonymous);
    let session = store.snapshot();
    assert!(!session.loading);
    assert!(!session.is_authenticated);
    assert!(session.user.is_none());
}

#[tokio::test]
async fn initialize_with_accepted_token_authenticates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Token abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 7, "email": "dpo@example.com"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (store, tokens) = store_with(&server, Some("abc123"));

    assert_eq!(store.initialize().await, AuthState::Authenticated);
    let session = store.snapshot();
    assert!(!session.loading);
    assert!(session.is_authenticated);
    assert_eq!(session.token.as_deref(), Some("abc123"));
    assert_eq!(session.user.unwrap().id, ResourceId::Int(7));
    assert_eq!(tokens.load().unwrap().as_deref(), Some("abc123"));
}

#[tokio::test]
async fn initialize_with_rejected_token_clears_storage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid token."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (store, tokens) = store_with(&server, Some("stale"));

    assert_eq!(store.initialize().await, AuthState::Anonymous);
    assert!(!store.snapshot().loading);
    assert_eq!(tokens.load().unwrap(), None);
}

#[tokio::test]
async fn initialize_with_malformed_user_clears_storage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let (store, tokens) = store_with(&server, Some("abc123"));

    assert_eq!(store.initialize().await, AuthState::Anonymous);
    assert!(!store.snapshot().loading);
    assert_eq!(tokens.load().unwrap(), None);
}

#[tokio::test]
async fn initialize_with_unreachable_server_clears_storage() {
    let tokens = Arc::new(MemoryTokenStore::with_token("abc123"));
    let store = connect(UNREACHABLE_URL, tokens.clone()).unwrap();

    assert_eq!(store.initialize().await, AuthState::Anonymous);
    assert!(!store.snapshot().loading);
    assert_eq!(tokens.load().unwrap(), None);
}

#[tokio::test]
async fn initialize_runs_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _) = store_with(&server, Some("abc123"));
    assert_eq!(store.initialize().await, AuthState::Authenticated);
    assert_eq!(store.initialize().await, AuthState::Authenticated);
}

#[tokio::test]
async fn logout_during_validation_leaves_session_anonymous() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 1}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (store, tokens) = store_with(&server, Some("abc123"));
    let other = store.clone();

    let (state, _) = tokio::join!(store.initialize(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        other.logout().await;
    });

    assert_eq!(state, AuthState::Anonymous);
    let session = store.snapshot();
    assert!(!session.is_authenticated);
    assert!(!session.loading);
    assert!(session.token.is_none());
    assert_eq!(tokens.load().unwrap(), None);
}

// =========================================================================
// login()
// =========================================================================

#[tokio::test]
async fn login_stores_token_and_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .and(body_json(json!({"username": "user@example.com", "password": "password"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"key": "abc123", "user": {"id": 1}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (store, tokens) = store_with(&server, None);
    store.initialize().await;

    let session = store.login("user@example.com", "password").await.unwrap();
    assert!(session.is_authenticated);
    assert_eq!(session.user.unwrap().id, ResourceId::Int(1));
    assert_eq!(tokens.load().unwrap().as_deref(), Some("abc123"));
    assert_eq!(store.state(), AuthState::Authenticated);
}

#[tokio::test]
async fn login_rejection_is_returned_and_state_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"non_field_errors": ["Invalid credentials"]})),
        )
        .mount(&server)
        .await;

    let (store, tokens) = store_with(&server, None);
    store.initialize().await;

    let err = store.login("user@example.com", "wrong").await.unwrap_err();
    match err {
        AuthError::Api(ref api) => {
            assert_eq!(api.status().map(|s| s.as_u16()), Some(400));
            assert_eq!(api.user_message(), "Invalid credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!store.snapshot().is_authenticated);
    assert_eq!(store.state(), AuthState::Anonymous);
    assert_eq!(tokens.load().unwrap(), None);
}

#[tokio::test]
async fn login_without_token_in_response_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"id": 1}})))
        .mount(&server)
        .await;

    let (store, tokens) = store_with(&server, None);
    store.initialize().await;

    let err = store.login("user@example.com", "password").await.unwrap_err();
    assert!(matches!(err, AuthError::MissingToken));
    assert_eq!(store.state(), AuthState::Anonymous);
    assert_eq!(tokens.load().unwrap(), None);
}

#[tokio::test]
async fn relogin_replaces_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"key": "second", "user": {"id": 1}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&server)
        .await;

    let (store, tokens) = store_with(&server, Some("first"));
    assert_eq!(store.initialize().await, AuthState::Authenticated);

    store.login("user@example.com", "password").await.unwrap();
    assert_eq!(store.state(), AuthState::Authenticated);
    assert_eq!(tokens.load().unwrap().as_deref(), Some("second"));
    assert_eq!(store.snapshot().token.as_deref(), Some("second"));
}

// =========================================================================
// logout()
// =========================================================================

#[tokio::test]
async fn logout_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout/"))
        .and(header("Authorization", "Token abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"detail": "Successfully logged out."})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&server)
        .await;

    let (store, tokens) = store_with(&server, Some("abc123"));
    store.initialize().await;

    store.logout().await;
    let session = store.snapshot();
    assert!(!session.is_authenticated);
    assert!(session.user.is_none());
    assert_eq!(tokens.load().unwrap(), None);
}

#[tokio::test]
async fn logout_clears_session_when_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"key": "abc123", "user": {"id": 1}})),
        )
        .mount(&server)
        .await;

    let (store, tokens) = store_with(&server, None);
    store.initialize().await;
    store.login("user@example.com", "password").await.unwrap();

    store.logout().await;
    assert_eq!(store.state(), AuthState::Anonymous);
    assert_eq!(tokens.load().unwrap(), None);
}

#[tokio::test]
async fn logout_clears_session_when_server_unreachable() {
    let tokens = Arc::new(MemoryTokenStore::with_token("abc123"));
    let store = connect(UNREACHABLE_URL, tokens.clone()).unwrap();

    store.logout().await;
    assert_eq!(store.state(), AuthState::Anonymous);
    assert!(!store.snapshot().loading);
    assert_eq!(tokens.load().unwrap(), None);
}

// =========================================================================
// Persistence and notification
// =========================================================================

#[tokio::test]
async fn token_survives_restart_with_file_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"key": "persisted", "user": {"id": 3}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/"))
        .and(header("Authorization", "Token persisted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();

    let first = connect(&api_url(&server), Arc::new(FileTokenStore::new(dir.path()))).unwrap();
    first.initialize().await;
    first.login("user@example.com", "password").await.unwrap();
    drop(first);

    let second = connect(&api_url(&server), Arc::new(FileTokenStore::new(dir.path()))).unwrap();
    assert_eq!(second.initialize().await, AuthState::Authenticated);
    assert_eq!(second.snapshot().user.unwrap().id, ResourceId::Int(3));
}

#[tokio::test]
async fn subscribers_observe_transitions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"key": "abc123", "user": {"id": 1}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (store, _) = store_with(&server, None);
    let mut rx = store.handle().subscribe();
    assert!(rx.borrow_and_update().loading);

    store.initialize().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().state(), AuthState::Anonymous);

    store.login("user@example.com", "password").await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().state(), AuthState::Authenticated);

    store.logout().await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().state(), AuthState::Anonymous);
}
