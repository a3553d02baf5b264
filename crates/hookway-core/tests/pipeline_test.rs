//! End-to-end tests for the request pipeline.
//!
//! Drives `Handler::handle_payload` with an in-memory document store and
//! checks both the outcome and what (if anything) was dispatched.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use hookway_core::{
    crypto,
    store::mock::MockDocumentStore,
    DocumentStatus, FailureKind, GatewayError, Handler, InboundRequest, PolicyRegistry, StoreError,
};
use serde_json::json;

const JSON_DOC: &str = r#"{"key":"value"}"#;

fn handler(config: serde_json::Value, default_workspace: &str, store: &MockDocumentStore) -> Handler {
    let registry = PolicyRegistry::from_json(&config.to_string()).unwrap();
    Handler::new(Arc::new(store.clone()), Arc::new(registry), default_workspace)
}

fn noop_config() -> serde_json::Value {
    json!({
        "/path": {"workspace": "workspace", "collection": "collection", "auth": {"type": "noop"}}
    })
}

#[tokio::test]
async fn added_document_succeeds() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("collection")]);
    let handler = handler(noop_config(), "commons", &store);

    let delivery = handler.handle_payload(&InboundRequest::new("/path", JSON_DOC)).await.unwrap();

    assert_eq!(delivery.workspace, "workspace");
    assert_eq!(delivery.collection, "collection");
    assert_eq!(delivery.documents, 1);

    let calls = store.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].workspace, "workspace");
    assert_eq!(calls[0].collection, "collection");
    assert_eq!(calls[0].payload, Bytes::from_static(JSON_DOC.as_bytes()));
}

#[tokio::test]
async fn failed_document_status_is_bad_document() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::new("collection", "FAILED")]);
    let handler = handler(noop_config(), "commons", &store);

    let error = handler.handle_payload(&InboundRequest::new("/path", JSON_DOC)).await.unwrap_err();

    match error {
        GatewayError::BadDocument { workspace, collection, status } => {
            assert_eq!(workspace, "workspace");
            assert_eq!(collection, "collection");
            assert_eq!(status, "FAILED");
        },
        other => panic!("expected BadDocument, got {other:?}"),
    }
}

#[tokio::test]
async fn unconfigured_path_never_reaches_store() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("collection")]);
    let handler = handler(noop_config(), "commons", &store);

    let error = handler.handle_payload(&InboundRequest::new("/missing", JSON_DOC)).await.unwrap_err();

    assert_eq!(error.kind(), FailureKind::MissingPath);
    assert_eq!(store.call_count().await, 0);
}

#[tokio::test]
async fn store_error_is_dispatch_error() {
    let store = MockDocumentStore::failing(StoreError::network("connection refused"));
    let handler = handler(noop_config(), "commons", &store);

    let request = InboundRequest::new("/path", STANDARD.encode(JSON_DOC)).base64_encoded();
    let error = handler.handle_payload(&request).await.unwrap_err();

    assert!(matches!(error, GatewayError::DispatchError(StoreError::Network { .. })));
    assert_eq!(store.calls().await[0].payload, Bytes::from_static(JSON_DOC.as_bytes()));
}

#[tokio::test]
async fn empty_workspace_uses_default() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("collection")]);
    let config = json!({"/path": {"collection": "collection", "auth": {"type": "noop"}}});
    let handler = handler(config, "commons", &store);

    let delivery = handler.handle_payload(&InboundRequest::new("/path", JSON_DOC)).await.unwrap();

    assert_eq!(delivery.workspace, "commons");
    assert_eq!(store.calls().await[0].workspace, "commons");
}

#[tokio::test]
async fn wrap_flag_dispatches_array() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("collection")]);
    let config = json!({"/path": {"collection": "collection", "wrap": true, "auth": {"type": "noop"}}});
    let handler = handler(config, "commons", &store);

    handler.handle_payload(&InboundRequest::new("/path", r#"{"k":1}"#)).await.unwrap();

    assert_eq!(store.calls().await[0].payload, Bytes::from_static(br#"[{"k":1}]"#));
}

#[tokio::test]
async fn base64_body_is_decoded_before_wrapping() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("collection")]);
    let config = json!({"/path": {"collection": "collection", "wrap": true, "auth": {"type": "noop"}}});
    let handler = handler(config, "commons", &store);

    let request = InboundRequest::new("/path", STANDARD.encode(JSON_DOC)).base64_encoded();
    handler.handle_payload(&request).await.unwrap();

    let payload = store.calls().await[0].payload.clone();
    let dispatched: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(dispatched, json!([{"key": "value"}]));
}

#[tokio::test]
async fn line_wrapped_base64_body_is_dispatched_decoded() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("collection")]);
    let handler = handler(noop_config(), "commons", &store);

    let document = json!({"description": "w".repeat(150), "count": 3});
    let encoded = STANDARD.encode(document.to_string());
    let mut wrapped = String::new();
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % 76 == 0 {
            wrapped.push_str("\r\n");
        }
        wrapped.push(c);
    }

    let request = InboundRequest::new("/path", wrapped).base64_encoded();
    handler.handle_payload(&request).await.unwrap();

    let payload = store.calls().await[0].payload.clone();
    let dispatched: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(dispatched, document);
}

#[tokio::test]
async fn malformed_base64_is_decode_error() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("collection")]);
    let handler = handler(noop_config(), "commons", &store);

    let request = InboundRequest::new("/path", "%%%").base64_encoded();
    let error = handler.handle_payload(&request).await.unwrap_err();

    assert_eq!(error.kind(), FailureKind::DecodeError);
    assert_eq!(store.call_count().await, 0);
}

#[tokio::test]
async fn denied_paths_fail_authentication() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("c")]);
    let config = json!({
        "/unknown": {"collection": "c", "auth": {"type": "basic", "secret": "s"}},
        "/empty": {"collection": "c", "auth": {"type": ""}},
        "/absent": {"collection": "c"}
    });
    let handler = handler(config, "commons", &store);

    for path in ["/unknown", "/empty", "/absent"] {
        let error = handler.handle_payload(&InboundRequest::new(path, JSON_DOC)).await.unwrap_err();
        assert_eq!(error.kind(), FailureKind::AuthFailed, "{path} should fail closed");
    }
    assert_eq!(store.call_count().await, 0);
}

#[tokio::test]
async fn header_auth_gates_dispatch() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("c")]);
    let config = json!({
        "/partner": {"collection": "c", "auth": {"type": "header", "secret": "secret", "header": "X-Secret"}}
    });
    let handler = handler(config, "commons", &store);

    let rejected = InboundRequest::new("/partner", JSON_DOC).with_header("x-secret", "incorrect");
    let error = handler.handle_payload(&rejected).await.unwrap_err();
    assert_eq!(error.kind(), FailureKind::AuthFailed);
    assert_eq!(error.public_message(), "[E2002] Authentication failed");
    assert_eq!(store.call_count().await, 0);

    let accepted = InboundRequest::new("/partner", JSON_DOC).with_header("x-secret", "secret");
    handler.handle_payload(&accepted).await.unwrap();
    assert_eq!(store.call_count().await, 1);
}

#[tokio::test]
async fn signature_is_checked_on_raw_body() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("c")]);
    let config = json!({
        "/signed": {"collection": "c", "wrap": true, "auth": {"type": "signature", "secret": "key"}}
    });
    let handler = handler(config, "commons", &store);

    let encoded = STANDARD.encode(JSON_DOC);
    let signature = crypto::sign(encoded.as_bytes(), "key").unwrap();
    let request = InboundRequest::new("/signed", encoded)
        .with_header("X-Signature", format!("sha256={signature}"))
        .base64_encoded();

    handler.handle_payload(&request).await.unwrap();
    assert_eq!(
        store.calls().await[0].payload,
        Bytes::from(format!("[{JSON_DOC}]"))
    );
}

#[tokio::test]
async fn signature_over_wrapped_body_is_rejected() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("c")]);
    let config = json!({
        "/signed": {"collection": "c", "wrap": true, "auth": {"type": "signature", "secret": "key"}}
    });
    let handler = handler(config, "commons", &store);

    let signature = crypto::sign(format!("[{JSON_DOC}]").as_bytes(), "key").unwrap();
    let request = InboundRequest::new("/signed", JSON_DOC).with_header("x-signature", signature);

    let error = handler.handle_payload(&request).await.unwrap_err();
    assert_eq!(error.kind(), FailureKind::AuthFailed);
}

#[tokio::test]
async fn concurrent_requests_share_handler() {
    let store = MockDocumentStore::returning(vec![DocumentStatus::added("collection")]);
    let handler = handler(noop_config(), "commons", &store);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let handler = handler.clone();
            tokio::spawn(async move {
                let body = format!(r#"{{"n":{i}}}"#);
                handler.handle_payload(&InboundRequest::new("/path", body)).await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(store.call_count().await, 16);
}
