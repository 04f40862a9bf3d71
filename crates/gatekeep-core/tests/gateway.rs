//! Gateway behaviour against a live mock server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use gatekeep_core::events::{AppEvent, EventChannel, Route, Toast};
use gatekeep_core::gateway::error::{CONNECTIVITY_ERROR_MESSAGE, GENERIC_ERROR_MESSAGE, NOT_AUTHORIZED_MESSAGE};
use gatekeep_core::gateway::{Gateway, GatewayError, Outcome, Payload, StoredCredential};
use gatekeep_core::storage::{KeyValueStore, MemoryStore, TOKEN_KEY, USER_ID_KEY};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use common::{drain, hide_loading, navigate, toast};

fn gateway(base: &str, store: Arc<MemoryStore>) -> (Gateway, UnboundedReceiver<AppEvent>) {
    let (channel, rx) = EventChannel::new();
    let channel = Arc::new(channel);
    let gateway = Gateway::new(
        Url::parse(base).unwrap(),
        Duration::from_secs(5),
        Arc::new(StoredCredential::new(store)),
        channel.clone(),
        channel,
    )
    .unwrap();
    (gateway, rx)
}

fn no_authorization(req: &Request) -> bool {
    !req.headers.contains_key("authorization")
}

#[tokio::test]
async fn test_attaches_bearer_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_values([(TOKEN_KEY, "tok-123")]));
    let (gateway, mut rx) = gateway(&format!("{}/api", server.uri()), store);

    let payload = gateway.get("users/profile").await.unwrap();
    assert_eq!(payload, Payload::Json(json!({"name": "Ada"})));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_omits_header_without_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/things"))
        .and(no_authorization)
        .and(body_json(json!({"name": "widget"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let (gateway, _rx) = gateway(&format!("{}/api/", server.uri()), store);

    let payload = gateway.post("/things", &json!({"name": "widget"})).await.unwrap();
    assert_eq!(payload.as_json(), Some(&json!({"id": 7})));
}

#[tokio::test]
async fn test_credential_read_failure_does_not_block_request() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/things/7"))
        .and(no_authorization)
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_values([(TOKEN_KEY, "tok-123")]));
    store.set_failing(true);
    let (gateway, mut rx) = gateway(&format!("{}/api", server.uri()), store);

    let payload = gateway.delete("things/7").await.unwrap();
    assert_eq!(payload, Payload::empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_empty_success_body_is_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (gateway, _rx) = gateway(&format!("{}/api", server.uri()), Arc::new(MemoryStore::new()));

    let payload = gateway.put("users/profile", &json!({"bio": ""})).await.unwrap();
    assert_eq!(payload.as_json(), Some(&json!({})));
}

#[tokio::test]
async fn test_binary_body_returned_unmodified() {
    let server = MockServer::start().await;
    let bytes: Vec<u8> = vec![0x25, 0x50, 0x44, 0x46, 0x00, 0xff, 0x7b, 0x7d];
    Mock::given(method("GET"))
        .and(path("/api/reports/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(bytes.clone(), "application/octet-stream"))
        .mount(&server)
        .await;

    let (gateway, _rx) = gateway(&format!("{}/api", server.uri()), Arc::new(MemoryStore::new()));

    match gateway.get("reports/latest").await.unwrap() {
        Payload::Binary { bytes: body, content_type } => {
            assert_eq!(body, bytes);
            assert_eq!(content_type.as_deref(), Some("application/octet-stream"));
        }
        other => panic!("expected binary payload, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_uses_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "database offline"})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_values([(TOKEN_KEY, "tok-123")]));
    let (gateway, mut rx) = gateway(&format!("{}/api", server.uri()), store.clone());

    let result = gateway.get("users/profile").await;
    assert_eq!(Outcome::from(&result), Outcome::ServerError("database offline".to_string()));
    assert!(matches!(result, Err(GatewayError::Server { status: 500, .. })));

    assert_eq!(
        drain(&mut rx),
        vec![hide_loading(), toast(Toast::danger("database offline"))]
    );
    // Session untouched
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-123"));
}

#[tokio::test]
async fn test_server_error_without_message_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let (gateway, mut rx) = gateway(&format!("{}/api", server.uri()), Arc::new(MemoryStore::new()));

    let err = gateway.get("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(
        drain(&mut rx),
        vec![hide_loading(), toast(Toast::danger(GENERIC_ERROR_MESSAGE))]
    );
}

#[tokio::test]
async fn test_unauthorized_revokes_credential_and_redirects() {
    for status in [401u16, 403] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/profile"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"message": "jwt expired"})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::with_values([(TOKEN_KEY, "stale"), (USER_ID_KEY, "u1")]));
        let (gateway, mut rx) = gateway(&format!("{}/api", server.uri()), store.clone());

        let err = gateway.get("users/profile").await.unwrap_err();
        assert!(err.is_unauthorized(), "status {}", status);

        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        // Only the credential is revoked
        assert_eq!(store.get(USER_ID_KEY).unwrap().as_deref(), Some("u1"));
        assert_eq!(
            drain(&mut rx),
            vec![
                hide_loading(),
                toast(Toast::danger(NOT_AUTHORIZED_MESSAGE)),
                navigate(Route::Login),
            ]
        );
    }
}

#[tokio::test]
async fn test_unreachable_server_reports_connectivity() {
    let base = format!("{}/api", common::dead_server_uri());
    let store = Arc::new(MemoryStore::with_values([(TOKEN_KEY, "tok-123")]));
    let (gateway, mut rx) = gateway(&base, store.clone());

    let result = gateway.get("users/profile").await;
    assert_eq!(Outcome::from(&result), Outcome::NetworkUnreachable);
    assert!(matches!(result, Err(GatewayError::NetworkUnreachable(_))));

    assert_eq!(
        drain(&mut rx),
        vec![hide_loading(), toast(Toast::danger(CONNECTIVITY_ERROR_MESSAGE))]
    );
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-123"));
}

#[tokio::test]
async fn test_multipart_put_sets_form_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/uploads"))
        .and(|req: &Request| {
            req.headers
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.starts_with("multipart/form-data"))
                .unwrap_or(false)
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stored": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (gateway, _rx) = gateway(&format!("{}/api", server.uri()), Arc::new(MemoryStore::new()));
    let body = gatekeep_core::MultipartBody::new()
        .text("label", "logo")
        .file("file", "logo.png", Some("image/png"), vec![1, 2, 3]);

    let payload = gateway.put_multipart("uploads", body).await.unwrap();
    assert_eq!(payload.as_json(), Some(&json!({"stored": true})));
}

#[tokio::test]
async fn test_local_request_failure_uses_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_values([(TOKEN_KEY, "tok-123")]));
    let (gateway, mut rx) = gateway(&format!("{}/api", server.uri()), store.clone());
    let body = gatekeep_core::MultipartBody::new().file("file", "logo.png", Some("not a mime"), vec![1]);

    let err = gateway.put_multipart("uploads", body).await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidBody(_)));
    assert!(err.is_local());

    assert_eq!(
        drain(&mut rx),
        vec![hide_loading(), toast(Toast::danger(GENERIC_ERROR_MESSAGE))]
    );
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-123"));
}
