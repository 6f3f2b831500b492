//! Contract tests for AuthClient against the `/auth/v1` surface.

use circle_client::auth::SignUpProfile;
use circle_client::{ApiError, CircleClient, ClientConfig};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

fn test_client(mock_server: &MockServer) -> CircleClient {
    let config = ClientConfig::new(&mock_server.uri(), "anon-key").unwrap();
    CircleClient::new(config).unwrap()
}

fn user_json() -> serde_json::Value {
    serde_json::json!({
        "id": USER_ID,
        "email": "jo@example.com",
        "user_metadata": {"username": "jodoe"},
        "created_at": "2026-01-15T12:00:00Z"
    })
}

fn session_json() -> serde_json::Value {
    serde_json::json!({
        "access_token": "user-token",
        "refresh_token": "refresh",
        "token_type": "bearer",
        "expires_in": 3600,
        "user": user_json()
    })
}

fn profile() -> SignUpProfile {
    SignUpProfile {
        first_name: "Jo".into(),
        last_name: "Doe".into(),
        gender: "female".into(),
        age: 20,
        country: "Kenya".into(),
        username: "jodoe".into(),
        interests: vec!["music".into(), "travel".into()],
    }
}

async fn mount_sign_in(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
        .mount(mock_server)
        .await;
}

// ── POST /auth/v1/signup ─────────────────────────────────────────────

#[tokio::test]
async fn sign_up_sends_profile_as_metadata_and_signs_in() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_partial_json(serde_json::json!({
            "email": "jo@example.com",
            "password": "secret123",
            "data": {"username": "jodoe", "age": 20, "interests": ["music", "travel"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let mut watch = client.auth().watch();
    let user = client
        .auth()
        .sign_up("jo@example.com", "secret123", &profile())
        .await
        .unwrap();

    assert_eq!(user.id.to_string(), USER_ID);
    assert!(client.auth().session().is_some());
    assert!(watch.has_changed().unwrap());
    assert_eq!(
        watch.borrow_and_update().as_ref().map(|u| u.id),
        Some(user.id)
    );
}

#[tokio::test]
async fn sign_up_pending_confirmation_leaves_session_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let user = client
        .auth()
        .sign_up("jo@example.com", "secret123", &profile())
        .await
        .unwrap();

    assert_eq!(user.email.as_deref(), Some("jo@example.com"));
    assert!(client.auth().session().is_none());
}

#[tokio::test]
async fn sign_up_duplicate_email_surfaces_backend_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(
            ResponseTemplate::new(422).set_body_string(r#"{"msg":"User already registered"}"#),
        )
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .auth()
        .sign_up("jo@example.com", "secret123", &profile())
        .await
        .unwrap_err();
    match err {
        ApiError::Api { status, body, .. } => {
            assert_eq!(status, 422);
            assert!(body.contains("already registered"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

// ── POST /auth/v1/token ──────────────────────────────────────────────

#[tokio::test]
async fn sign_in_switches_bearer_to_user_token() {
    let mock_server = MockServer::start().await;
    mount_sign_in(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer user-token"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client
        .auth()
        .sign_in("jo@example.com", "secret123")
        .await
        .unwrap();
    let user = client.auth().get_user().await.unwrap();
    assert_eq!(user.id.to_string(), USER_ID);
}

#[tokio::test]
async fn sign_in_with_bad_credentials_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid login credentials"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let result = client.auth().sign_in("jo@example.com", "wrong").await;
    assert!(matches!(result, Err(ApiError::Api { status: 400, .. })));
    assert!(client.auth().session().is_none());
}

// ── POST /auth/v1/logout, GET /auth/v1/user ──────────────────────────

#[tokio::test]
async fn sign_out_clears_session_even_when_backend_fails() {
    let mock_server = MockServer::start().await;
    mount_sign_in(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client
        .auth()
        .sign_in("jo@example.com", "secret123")
        .await
        .unwrap();
    let mut watch = client.auth().watch();

    assert!(client.auth().sign_out().await.is_err());
    assert!(client.auth().session().is_none());
    assert!(watch.borrow_and_update().is_none());
}

#[tokio::test]
async fn sign_out_without_session_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client.auth().sign_out().await.unwrap();
}

#[tokio::test]
async fn get_user_requires_session() {
    let mock_server = MockServer::start().await;
    let client = test_client(&mock_server);
    assert!(matches!(
        client.auth().get_user().await,
        Err(ApiError::NotAuthenticated)
    ));
}
