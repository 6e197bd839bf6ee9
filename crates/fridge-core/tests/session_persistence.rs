//! Session persistence across simulated process restarts

use std::sync::Arc;

use fridge_core::auth::{FileStorage, SessionStorage, SessionStore, StorageError, User};
use fridge_core::{ApiClient, ApiError};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn open_store(dir: &tempfile::TempDir) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(FileStorage::new(dir.path().join("session.json"))))
}

#[tokio::test]
async fn test_login_survives_restart() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"username": "alice", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"tokens": {"accessToken": "a1", "refreshToken": "r1"}}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let session = open_store(&dir);
    let client = ApiClient::with_client(reqwest::Client::new(), &server.uri(), Arc::clone(&session));
    client.login("alice", "hunter2").await.expect("login");
    drop(client);
    drop(session);

    let restarted = open_store(&dir);
    assert!(!restarted.is_authenticated());
    assert!(restarted.restore());
    assert_eq!(restarted.access_token().as_deref(), Some("a1"));
    assert_eq!(
        restarted.snapshot().user,
        Some(User {
            username: "alice".to_string()
        })
    );
}

/// Storage whose writes always fail, like a read-only data directory
struct ReadOnlyStorage;

impl SessionStorage for ReadOnlyStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }
    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
    }
    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_login_with_unwritable_storage_keeps_issued_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"tokens": {"accessToken": "a1", "refreshToken": "r1"}}),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"tokens": {"accessToken": "b1", "refreshToken": "s1"}}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(SessionStore::new(ReadOnlyStorage));
    let client = ApiClient::with_client(reqwest::Client::new(), &server.uri(), Arc::clone(&session));

    client.login("alice", "hunter2").await.expect("login succeeds without persistence");
    assert!(session.is_authenticated());
    assert_eq!(session.access_token().as_deref(), Some("a1"));
    assert_eq!(session.snapshot().user.unwrap().username, "alice");

    client.register("bob", "pw", "pw").await.expect("register succeeds without persistence");
    assert_eq!(session.access_token().as_deref(), Some("b1"));
    assert_eq!(session.snapshot().user.unwrap().username, "bob");
}

#[tokio::test]
async fn test_failed_login_shows_server_message() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Invalid username or password", "code": 1})),
        )
        .mount(&server)
        .await;

    let session = open_store(&dir);
    let client = ApiClient::with_client(reqwest::Client::new(), &server.uri(), Arc::clone(&session));
    let err = client.login("alice", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid username or password");
    assert!(!session.is_authenticated());
    assert!(!dir.path().join("session.json").exists());
}

#[tokio::test]
async fn test_register_with_rejected_payload() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({"username": "bob", "password": "pw", "passwordConfirmation": "pw"})))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Username already exists", "code": 1})),
        )
        .mount(&server)
        .await;

    let session = open_store(&dir);
    let client = ApiClient::with_client(reqwest::Client::new(), &server.uri(), Arc::clone(&session));
    let err = client.register("bob", "pw", "pw").await.unwrap_err();
    assert!(matches!(err, ApiError::Application(ref m) if m == "Username already exists"));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_refreshed_pair_is_persisted() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let session = open_store(&dir);
    session.set_username("carol").unwrap();
    session
        .login(fridge_core::TokenPair::new("a1", "r1"))
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"tokens": {"accessToken": "a2", "refreshToken": "r2"}}),
        ))
        .mount(&server)
        .await;

    let client = ApiClient::with_client(reqwest::Client::new(), &server.uri(), Arc::clone(&session));
    assert_eq!(client.refresher().refresh().await, Ok("a2".to_string()));

    let restarted = open_store(&dir);
    assert!(restarted.restore());
    assert_eq!(restarted.access_token().as_deref(), Some("a2"));
    assert_eq!(restarted.snapshot().user.unwrap().username, "carol");
}

#[tokio::test]
async fn test_failed_refresh_erases_persisted_session() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    let session = open_store(&dir);
    session.set_username("dave").unwrap();
    session
        .login(fridge_core::TokenPair::new("a1", "r1"))
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = ApiClient::with_client(reqwest::Client::new(), &server.uri(), Arc::clone(&session));
    assert!(client.refresher().refresh().await.is_err());

    assert!(!open_store(&dir).restore());
}
