//! Storage network client tests against an in-process gateway.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::put,
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proof_vault::proof::ContentHash;
use proof_vault::services::storage::{NetworkStore, StorageBackend, StorageError, StorageSource};

#[derive(Clone, Default)]
struct Gateway {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    /// Number of requests to fail with 500 before behaving
    failures_left: Arc<AtomicUsize>,
    /// When set, every request is refused with this status
    refuse_with: Arc<Mutex<Option<StatusCode>>>,
    requests: Arc<AtomicUsize>,
}

impl Gateway {
    fn refusal(&self) -> Option<StatusCode> {
        *self.refuse_with.lock().unwrap()
    }

    fn flaky(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

async fn put_blob(
    State(gw): State<Gateway>,
    Path(key): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    if gw.flaky() {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))).into_response();
    }
    if let Some(status) = gw.refusal() {
        return status.into_response();
    }
    gw.blobs.lock().unwrap().insert(key.clone(), body.to_vec());
    Json(json!({
        "root": format!("0xroot{}", &key[2..10]),
        "txHash": "0xfeedface"
    }))
    .into_response()
}

async fn get_blob(State(gw): State<Gateway>, Path(key): Path<String>) -> impl IntoResponse {
    if gw.flaky() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if let Some(status) = gw.refusal() {
        return status.into_response();
    }
    match gw.blobs.lock().unwrap().get(&key) {
        Some(bytes) => bytes.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_gateway(gateway: Gateway) -> String {
    let app = Router::new()
        .route("/blobs/:key", put(put_blob).get(get_blob))
        .with_state(gateway);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

fn client(url: &str) -> NetworkStore {
    NetworkStore::new(url, Duration::from_secs(5))
        .unwrap()
        .with_retry_window(Duration::from_secs(3))
}

#[tokio::test]
async fn upload_then_download_by_proof_hash() {
    let gateway = Gateway::default();
    let url = spawn_gateway(gateway.clone()).await;
    let store = client(&url);

    let key = ContentHash::digest(b"envelope");
    let payload = br#"{"proofHash":"0x00"}"#;

    let receipt = store.store(&key, payload).await.unwrap();
    assert_eq!(receipt.content_id, key);
    assert_eq!(receipt.source, StorageSource::Network);
    assert_eq!(receipt.tx_hash.as_deref(), Some("0xfeedface"));
    assert!(receipt.network_root.unwrap().starts_with("0xroot"));

    // Keyed by the 0x-prefixed proof hash, not the network root
    assert!(gateway.blobs.lock().unwrap().contains_key(&key.to_string()));

    assert_eq!(store.fetch(&key).await.unwrap(), payload.to_vec());
}

#[tokio::test]
async fn missing_blob_is_not_found_without_retry() {
    let gateway = Gateway::default();
    let url = spawn_gateway(gateway.clone()).await;
    let store = client(&url);

    let key = ContentHash::digest(b"absent");
    assert_eq!(store.fetch(&key).await.unwrap_err(), StorageError::NotFound(key));
    assert_eq!(gateway.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let gateway = Gateway::default();
    gateway.failures_left.store(2, Ordering::SeqCst);
    let url = spawn_gateway(gateway.clone()).await;
    let store = client(&url);

    let key = ContentHash::digest(b"flaky");
    store.store(&key, b"{}").await.unwrap();
    assert_eq!(gateway.requests.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn persistent_failure_surfaces_network_error() {
    let gateway = Gateway::default();
    gateway.failures_left.store(usize::MAX, Ordering::SeqCst);
    let url = spawn_gateway(gateway.clone()).await;
    let store = NetworkStore::new(&url, Duration::from_secs(2))
        .unwrap()
        .with_retry_window(Duration::from_millis(500));

    let err = store.fetch(&ContentHash::digest(b"down")).await.unwrap_err();
    assert!(matches!(err, StorageError::Network(_)), "{:?}", err);
    assert!(err.is_retryable());
    assert!(gateway.requests.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn rejected_upload_is_not_retried() {
    let gateway = Gateway::default();
    *gateway.refuse_with.lock().unwrap() = Some(StatusCode::PAYLOAD_TOO_LARGE);
    let url = spawn_gateway(gateway.clone()).await;
    let store = client(&url);

    let err = store
        .store(&ContentHash::digest(b"huge"), b"{}")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Rejected(ref m) if m.contains("413")), "{:?}", err);
    assert!(!err.is_retryable());
    assert_eq!(gateway.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn forbidden_download_is_not_retried() {
    let gateway = Gateway::default();
    *gateway.refuse_with.lock().unwrap() = Some(StatusCode::FORBIDDEN);
    let url = spawn_gateway(gateway.clone()).await;
    let store = client(&url);

    let err = store.fetch(&ContentHash::digest(b"locked")).await.unwrap_err();
    assert!(matches!(err, StorageError::Rejected(_)), "{:?}", err);
    assert_eq!(gateway.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_gateway_is_network_error() {
    let store = NetworkStore::new("http://127.0.0.1:1", Duration::from_secs(1))
        .unwrap()
        .with_retry_window(Duration::from_millis(300));

    let err = store
        .store(&ContentHash::digest(b"x"), b"{}")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Network(_)));
}
