//! Identity protocol against a mock server.

use std::sync::Arc;
use std::time::Duration;

use hearth_client::{Error, HttpIdentityClient};
use hearth_session::{IdentityAction, IdentityClient, MemoryStore, Session};
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> HttpIdentityClient {
    HttpIdentityClient::builder()
        .endpoint(format!("{}/session", server.uri()))
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

fn ident() -> MockBuilder {
    Mock::given(method("GET"))
        .and(path("/session"))
        .and(query_param("action", "ident"))
}

#[tokio::test]
async fn test_ident_with_username() {
    let server = MockServer::start().await;
    ident()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
        .expect(1)
        .mount(&server)
        .await;

    let identity = client_for(&server).await.ident().await.unwrap();
    assert_eq!(identity.username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_ident_without_username_is_anonymous() {
    let server = MockServer::start().await;
    ident()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": null})))
        .mount(&server)
        .await;

    let identity = client_for(&server).await.ident().await.unwrap();
    assert_eq!(identity.username, None);
}

#[tokio::test]
async fn test_ident_empty_object_is_anonymous() {
    let server = MockServer::start().await;
    ident()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let identity = client_for(&server).await.ident().await.unwrap();
    assert_eq!(identity.username, None);
}

#[tokio::test]
async fn test_error_status_maps_to_api_error() {
    let server = MockServer::start().await;
    ident()
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"message": "maintenance"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).await.ident().await.unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_error_status_without_body() {
    let server = MockServer::start().await;
    ident()
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client_for(&server).await.ident().await.unwrap_err();
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_malformed_body_is_json_error() {
    let server = MockServer::start().await;
    ident()
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).await.ident().await.unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    ident()
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"username": "late"}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = HttpIdentityClient::builder()
        .endpoint(format!("{}/session", server.uri()))
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let err = client.ident().await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_logout_accepts_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session"))
        .and(query_param("action", "logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).await.logout().await.unwrap();
}

#[tokio::test]
async fn test_sends_bearer_token() {
    let server = MockServer::start().await;
    ident()
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "bo"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpIdentityClient::builder()
        .endpoint(format!("{}/session", server.uri()))
        .auth_token("s3cret")
        .build()
        .unwrap();

    assert_eq!(client.ident().await.unwrap().username.as_deref(), Some("bo"));
}

#[tokio::test]
async fn test_trait_reports_transport_error() {
    let server = MockServer::start().await;
    ident()
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = HttpIdentityClient::builder().build().unwrap();
    let endpoint = Url::parse(&format!("{}/session", server.uri())).unwrap();
    let err = client
        .identify(&endpoint, IdentityAction::Ident)
        .await
        .unwrap_err();

    assert!(matches!(err, hearth_session::Error::Transport(_)));
}

#[tokio::test]
async fn test_session_establishes_from_server() {
    let server = MockServer::start().await;
    ident()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "cy"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    let session = Session::builder()
        .endpoint(Url::parse(&format!("{}/session", server.uri())).unwrap())
        .store(Arc::new(store.clone()))
        .identity(Arc::new(client_for(&server).await))
        .build()
        .unwrap();

    session.evaluate().await.unwrap();
    // Second cycle is served from the store.
    session.evaluate().await.unwrap();

    assert_eq!(session.username().as_deref(), Some("cy"));
    let record = session.record().unwrap();
    assert!(record.established);
    assert!(!record.locked);
}

#[tokio::test]
async fn test_session_survives_unreachable_server() {
    let server = MockServer::start().await;
    let endpoint = Url::parse(&format!("{}/session", server.uri())).unwrap();
    drop(server);

    let session = Session::builder()
        .endpoint(endpoint)
        .store(Arc::new(MemoryStore::new()))
        .identity(Arc::new(
            HttpIdentityClient::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap(),
        ))
        .build()
        .unwrap();

    let cycle = session.evaluate().await.unwrap();
    assert!(cycle.established().is_some());
    assert_eq!(session.username(), None);
}
