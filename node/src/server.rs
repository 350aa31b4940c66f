// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::extract::{Query, Request as AxumRequest, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use ledgerpost_kernel::hash::digest_from_hex;
use ledgerpost_kernel::{AppendReceipt, InclusionProof, LogRoot, LogStorage, VerifiableLog};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::api::*;
use crate::errors::NodeError;

/// Log behind the log service. Storage is picked at startup.
pub type SharedLog = Arc<VerifiableLog<Box<dyn LogStorage>>>;

/// Messages the delivery service has accepted, oldest first.
#[derive(Debug, Default)]
pub struct DeliveryInbox {
    messages: Mutex<Vec<DeliveredMessage>>,
}

impl DeliveryInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, payload: String) {
        let received_at_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.messages.lock().await.push(DeliveredMessage {
            payload,
            received_at_ms,
        });
    }

    pub async fn messages(&self) -> Vec<DeliveredMessage> {
        self.messages.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }
}

pub type SharedInbox = Arc<DeliveryInbox>;

async fn auth_guard(
    State(token): State<Arc<String>>,
    req: AxumRequest,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "));

    match provided {
        Some(provided) if provided == token.as_str() => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn finish(app: Router, auth_token: Option<String>) -> Router {
    let app = match auth_token {
        Some(token) => {
            tracing::info!("Auth Enabled: Bearer token required");
            app.layer(from_fn_with_state(Arc::new(token), auth_guard))
        }
        None => {
            tracing::warn!("Auth Disabled: No token configured");
            app
        }
    };
    app.layer(TraceLayer::new_for_http())
}

pub fn build_log_router(log: SharedLog, auth_token: Option<String>) -> Router {
    let app = Router::new()
        .route("/v1/log/append", post(append_entry))
        .route("/v1/log/root", get(current_root))
        .route("/v1/log/proof", get(inclusion_proof))
        .route("/v1/log/proof-by-hash", get(proof_by_hash))
        .route("/metrics", get(metrics_handler))
        .with_state(log);

    finish(app, auth_token)
}

pub fn build_delivery_router(inbox: SharedInbox, auth_token: Option<String>) -> Router {
    let app = Router::new()
        .route("/v1/deliver", post(deliver))
        .route("/v1/deliver/inbox", get(inbox_messages))
        .route("/metrics", get(metrics_handler))
        .with_state(inbox);

    finish(app, auth_token)
}

async fn append_entry(
    State(log): State<SharedLog>,
    Json(req): Json<AppendRequest>,
) -> Result<Json<AppendReceipt>, NodeError> {
    req.entry.validate()?;

    // Storage may fsync; keep it off the async workers.
    let receipt = tokio::task::spawn_blocking(move || log.append_with_proof(req.entry))
        .await
        .map_err(|e| {
            tracing::error!("Append task failed: {}", e);
            NodeError::Internal
        })??;

    metrics::increment_counter!("ledgerpost_entries_appended_total");
    tracing::debug!("Appended leaf {} (size {})", receipt.leaf_index, receipt.root.size);
    Ok(Json(receipt))
}

async fn current_root(State(log): State<SharedLog>) -> Json<LogRoot> {
    Json(log.current_root())
}

/// The root a proof request names: the given hash at `tree_size`, or the
/// log's own root at that size.
fn resolve_root(log: &SharedLog, tree_size: u64, root_hash: Option<&str>) -> Result<LogRoot, NodeError> {
    match root_hash {
        Some(hex) => {
            let root_hash = digest_from_hex(hex)
                .ok_or_else(|| NodeError::InvalidInput(format!("malformed root_hash '{}'", hex)))?;
            Ok(LogRoot {
                size: tree_size,
                root_hash,
            })
        }
        None => Ok(log.root_at(tree_size)?),
    }
}

async fn inclusion_proof(
    State(log): State<SharedLog>,
    Query(query): Query<ProofQuery>,
) -> Result<Json<InclusionProof>, NodeError> {
    let root = resolve_root(&log, query.tree_size, query.root_hash.as_deref())?;
    let proof = log.prove_inclusion(query.leaf_index, &root)?;
    Ok(Json(proof))
}

async fn proof_by_hash(
    State(log): State<SharedLog>,
    Query(query): Query<ProofByHashQuery>,
) -> Result<Json<InclusionProof>, NodeError> {
    let leaf = digest_from_hex(&query.leaf_hash)
        .ok_or_else(|| NodeError::InvalidInput(format!("malformed leaf_hash '{}'", query.leaf_hash)))?;
    let root = resolve_root(&log, query.tree_size, query.root_hash.as_deref())?;
    let proof = log.prove_by_hash(&leaf, &root)?;
    Ok(Json(proof))
}

async fn deliver(
    State(inbox): State<SharedInbox>,
    Json(req): Json<DeliverRequest>,
) -> Result<Json<DeliverResponse>, NodeError> {
    if req.payload.is_empty() {
        return Err(NodeError::InvalidInput("payload must not be empty".to_string()));
    }

    tracing::info!("Received message: {}", req.payload);
    inbox.push(req.payload).await;
    metrics::increment_counter!("ledgerpost_messages_delivered_total");

    Ok(Json(DeliverResponse { accepted: true }))
}

async fn inbox_messages(State(inbox): State<SharedInbox>) -> Json<InboxResponse> {
    Json(InboxResponse {
        messages: inbox.messages().await,
    })
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
