use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use ledgerpost_kernel::hash::digest_to_hex;
use ledgerpost_kernel::{
    AppendReceipt, Entry, InclusionProof, InclusionVerifier, LogRoot, LogStorage, MemoryStorage, VerifiableLog,
};
use ledgerpost_node::api::{AppendRequest, DeliverRequest, InboxResponse};
use ledgerpost_node::server::{build_delivery_router, build_log_router, DeliveryInbox, SharedLog};
use ledgerpost_persistence::FileLogStorage;
use serde::de::DeserializeOwned;
use tempfile::tempdir;
use tower::util::ServiceExt;

fn memory_log() -> SharedLog {
    let storage: Box<dyn LogStorage> = Box::new(MemoryStorage::new());
    Arc::new(VerifiableLog::open(storage).unwrap())
}

fn append_request(entry: &Entry) -> Request<Body> {
    let body = serde_json::to_vec(&AppendRequest { entry: entry.clone() }).unwrap();
    Request::builder()
        .method("POST")
        .uri("/v1/log/append")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_json<T: DeserializeOwned>(resp: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn append(app: &Router, entry: &Entry) -> AppendReceipt {
    let resp = app.clone().oneshot(append_request(entry)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    read_json(resp).await
}

#[tokio::test]
async fn test_append_returns_verifiable_receipt() {
    let log = memory_log();
    let app = build_log_router(log.clone(), None);

    let first = Entry::new("alice", "hello", 1);
    let second = Entry::new("bob", "world", 2);

    let r0 = append(&app, &first).await;
    let r1 = append(&app, &second).await;

    assert_eq!(r0.leaf_index, 0);
    assert_eq!(r1.leaf_index, 1);
    assert_eq!(r1.root, log.current_root());

    let proof = r1.proof.expect("service attaches proofs");
    assert!(InclusionVerifier::verify(&second, 1, &r1.root, &proof));
}

#[tokio::test]
async fn test_append_rejects_invalid_entry() {
    let log = memory_log();
    let app = build_log_router(log.clone(), None);

    let resp = app
        .oneshot(append_request(&Entry::new("alice", "", 1)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(log.size(), 0);
}

#[tokio::test]
async fn test_root_and_proof_endpoints() {
    let log = memory_log();
    let app = build_log_router(log.clone(), None);

    let resp = app.clone().oneshot(get("/v1/log/root")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let empty: LogRoot = read_json(resp).await;
    assert_eq!(empty, LogRoot::empty());

    let entries: Vec<Entry> = (0..5).map(|i| Entry::new("alice", format!("m{}", i), i)).collect();
    for e in &entries {
        append(&app, e).await;
    }
    let old_root = log.root_at(3).unwrap();

    // Proof against an earlier root, named by size only.
    let resp = app
        .clone()
        .oneshot(get("/v1/log/proof?leaf_index=2&tree_size=3"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let proof: InclusionProof = read_json(resp).await;
    assert!(InclusionVerifier::verify(&entries[2], 2, &old_root, &proof));

    // Same proof, root named explicitly.
    let uri = format!(
        "/v1/log/proof?leaf_index=2&tree_size=3&root_hash={}",
        digest_to_hex(&old_root.root_hash)
    );
    let resp = app.clone().oneshot(get(&uri)).await.unwrap();
    let again: InclusionProof = read_json(resp).await;
    assert_eq!(again, proof);
}

#[tokio::test]
async fn test_proof_errors() {
    let log = memory_log();
    let app = build_log_router(log.clone(), None);
    append(&app, &Entry::new("alice", "hello", 1)).await;

    let resp = app
        .clone()
        .oneshot(get("/v1/log/proof?leaf_index=1&tree_size=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let uri = format!("/v1/log/proof?leaf_index=0&tree_size=1&root_hash={}", "ab".repeat(32));
    let resp = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .clone()
        .oneshot(get("/v1/log/proof?leaf_index=0&tree_size=1&root_hash=nothex"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_proof_by_hash_endpoint() {
    let log = memory_log();
    let app = build_log_router(log.clone(), None);

    let repeated = Entry::new("alice", "ping", 1);
    let later = Entry::new("bob", "pong", 2);
    for e in [&repeated, &Entry::new("carol", "mid", 3), &repeated, &later] {
        append(&app, e).await;
    }
    let root = log.current_root();
    let leaf = repeated.leaf_hash().unwrap();

    // The earliest copy is the one proven.
    let uri = format!("/v1/log/proof-by-hash?leaf_hash={}&tree_size=4", digest_to_hex(&leaf));
    let resp = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let proof: InclusionProof = read_json(resp).await;
    assert_eq!(proof.leaf_index, 0);
    assert!(InclusionVerifier::verify_leaf(&leaf, 0, &root, &proof));

    // Not yet in the log at size 3.
    let late = later.leaf_hash().unwrap();
    let uri = format!("/v1/log/proof-by-hash?leaf_hash={}&tree_size=3", digest_to_hex(&late));
    let resp = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let uri = format!(
        "/v1/log/proof-by-hash?leaf_hash={}&tree_size=4&root_hash={}",
        digest_to_hex(&leaf),
        "cd".repeat(32)
    );
    let resp = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .clone()
        .oneshot(get("/v1/log/proof-by-hash?leaf_hash=zz&tree_size=4"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_guard() {
    let app = build_log_router(memory_log(), Some("secret".to_string()));

    let resp = app.clone().oneshot(get("/v1/log/root")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/v1/log/root")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/v1/log/root")
        .header(header::AUTHORIZATION, "Bearer secret")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn test_file_backed_log_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("entries.log");

    let root = {
        let storage: Box<dyn LogStorage> = Box::new(FileLogStorage::open(&path).unwrap());
        let log: SharedLog = Arc::new(VerifiableLog::open(storage).unwrap());
        let app = build_log_router(log.clone(), None);
        for i in 0..3 {
            append(&app, &Entry::new("alice", format!("m{}", i), i)).await;
        }
        log.current_root()
    };

    let storage: Box<dyn LogStorage> = Box::new(FileLogStorage::open(&path).unwrap());
    let log: SharedLog = Arc::new(VerifiableLog::open(storage).unwrap());
    assert_eq!(log.current_root(), root);

    let app = build_log_router(log, None);
    let next = append(&app, &Entry::new("alice", "m3", 3)).await;
    assert_eq!(next.leaf_index, 3);
}

#[tokio::test]
async fn test_delivery_service_inbox() {
    let inbox = Arc::new(DeliveryInbox::new());
    let app = build_delivery_router(inbox.clone(), None);

    let deliver = |payload: &str| {
        let body = serde_json::to_vec(&DeliverRequest {
            payload: payload.to_string(),
        })
        .unwrap();
        Request::builder()
            .method("POST")
            .uri("/v1/deliver")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    };

    assert_eq!(app.clone().oneshot(deliver("hello")).await.unwrap().status(), StatusCode::OK);
    assert_eq!(app.clone().oneshot(deliver("")).await.unwrap().status(), StatusCode::BAD_REQUEST);

    let resp = app.oneshot(get("/v1/deliver/inbox")).await.unwrap();
    let body: InboxResponse = read_json(resp).await;
    assert_eq!(body.messages.len(), 1);
    assert_eq!(body.messages[0].payload, "hello");
    assert_eq!(inbox.len().await, 1);
}
