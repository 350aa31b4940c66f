use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ledgerpost_kernel::{Entry, InclusionVerifier, LogError, LogStorage, MemoryStorage, VerifiableLog};
use ledgerpost_node::config::PipelineConfig;
use ledgerpost_node::network::{HttpDeliverySink, HttpLogClient, LogClient};
use ledgerpost_node::pipeline::{DeliveryPipeline, LogFailure, PipelineResult};
use ledgerpost_node::server::{build_delivery_router, build_log_router, DeliveryInbox, SharedInbox, SharedLog};
use tokio::net::TcpListener;

async fn serve(app: axum::Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn start_log_service(token: Option<&str>) -> (SharedLog, SocketAddr) {
    let storage: Box<dyn LogStorage> = Box::new(MemoryStorage::new());
    let log: SharedLog = Arc::new(VerifiableLog::open(storage).unwrap());
    let addr = serve(build_log_router(log.clone(), token.map(str::to_string))).await;
    (log, addr)
}

async fn start_delivery_service() -> (SharedInbox, SocketAddr) {
    let inbox: SharedInbox = Arc::new(DeliveryInbox::new());
    let addr = serve(build_delivery_router(inbox.clone(), None)).await;
    (inbox, addr)
}

fn pipeline(log_url: &str, delivery_url: &str, verify_proof: bool) -> DeliveryPipeline {
    let cfg = PipelineConfig {
        log_service_url: log_url.to_string(),
        delivery_service_url: delivery_url.to_string(),
        send_timeout: Duration::from_secs(5),
        verify_proof,
        ..Default::default()
    };
    let log = HttpLogClient::new(&cfg.log_service_url, cfg.connect_timeout).unwrap();
    let sink = HttpDeliverySink::new(&cfg.delivery_service_url, cfg.connect_timeout).unwrap();
    DeliveryPipeline::new(Arc::new(log), Arc::new(sink), cfg)
}

#[tokio::test]
async fn test_send_over_http() {
    let (log, log_addr) = start_log_service(None).await;
    let (inbox, delivery_addr) = start_delivery_service().await;
    let pipeline = pipeline(
        &format!("http://{}", log_addr),
        &format!("http://{}", delivery_addr),
        true,
    );

    let msg = Entry::new("alice", "hello", 1_700_000_000_000);
    let result = pipeline.send(msg.clone()).await;

    let receipt = result.receipt().expect("delivered").clone();
    assert_eq!(receipt.leaf_index, 0);
    assert_eq!(receipt.root, log.current_root());
    assert!(InclusionVerifier::verify(
        &msg,
        0,
        &receipt.root,
        receipt.proof.as_ref().unwrap()
    ));

    let messages = inbox.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].payload, "hello");
}

#[tokio::test]
async fn test_http_client_fetches_proof_for_old_root() {
    let (_log, log_addr) = start_log_service(None).await;
    let client = HttpLogClient::new(format!("http://{}", log_addr), Duration::from_secs(1)).unwrap();
    let deadline = Duration::from_secs(5);

    let first = Entry::new("alice", "one", 1);
    let receipt = client.log(&first, deadline).await.unwrap();
    client.log(&Entry::new("alice", "two", 2), deadline).await.unwrap();

    let now = client.current_root(deadline).await.unwrap();
    assert_eq!(now.size, 2);

    let proof = client.prove_inclusion(0, &receipt.root, deadline).await.unwrap();
    assert!(InclusionVerifier::verify(&first, 0, &receipt.root, &proof));
}

#[tokio::test]
async fn test_http_client_proves_by_leaf_hash() {
    let (_log, log_addr) = start_log_service(None).await;
    let client = HttpLogClient::new(format!("http://{}", log_addr), Duration::from_secs(1)).unwrap();
    let deadline = Duration::from_secs(5);

    let first = Entry::new("alice", "one", 1);
    client.log(&Entry::new("alice", "zero", 0), deadline).await.unwrap();
    client.log(&first, deadline).await.unwrap();
    let receipt = client.log(&Entry::new("alice", "two", 2), deadline).await.unwrap();

    let leaf = first.leaf_hash().unwrap();
    let proof = client.prove_by_hash(&leaf, &receipt.root, deadline).await.unwrap();
    assert_eq!(proof.leaf_index, 1);
    assert!(InclusionVerifier::verify(&first, 1, &receipt.root, &proof));

    let missing = Entry::new("mallory", "never logged", 3).leaf_hash().unwrap();
    let err = client.prove_by_hash(&missing, &receipt.root, deadline).await.unwrap_err();
    assert!(matches!(err, LogError::NotFound { .. }));
}

#[tokio::test]
async fn test_log_service_down_never_delivers() {
    // Bind then drop to get a port nothing listens on.
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let (inbox, delivery_addr) = start_delivery_service().await;
    let pipeline = pipeline(
        &format!("http://{}", dead),
        &format!("http://{}", delivery_addr),
        false,
    );

    let result = pipeline.send(Entry::new("alice", "hello", 1)).await;
    assert!(matches!(result, PipelineResult::LogFailed(LogFailure::Unavailable(_))));
    assert_eq!(inbox.len().await, 0);
}

#[tokio::test]
async fn test_auth_token_is_sent() {
    let (_log, log_addr) = start_log_service(Some("secret")).await;
    let deadline = Duration::from_secs(5);
    let entry = Entry::new("alice", "hello", 1);

    let anonymous = HttpLogClient::new(format!("http://{}", log_addr), Duration::from_secs(1)).unwrap();
    assert!(anonymous.log(&entry, deadline).await.is_err());

    let authorized = anonymous.clone().with_auth_token("secret");
    assert_eq!(authorized.log(&entry, deadline).await.unwrap().leaf_index, 0);
}
