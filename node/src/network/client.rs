// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Log clients.
//!
//! Every client validates the entry before any I/O, so a rejected entry
//! costs the log service nothing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ledgerpost_kernel::hash::{digest_to_hex, Digest};
use ledgerpost_kernel::{
    AppendReceipt, Entry, InclusionProof, LogError, LogResult, LogRoot, LogStorage, VerifiableLog,
};
use reqwest::{Client, StatusCode};

use crate::api::{AppendRequest, ErrorBody};

#[async_trait]
pub trait LogClient: Send + Sync {
    /// Append `entry`, giving up after `deadline`.
    async fn log(&self, entry: &Entry, deadline: Duration) -> LogResult<AppendReceipt>;

    async fn current_root(&self, deadline: Duration) -> LogResult<LogRoot>;

    /// Proof for `leaf_index` against `root`.
    async fn prove_inclusion(
        &self,
        leaf_index: u64,
        root: &LogRoot,
        deadline: Duration,
    ) -> LogResult<InclusionProof>;
}

fn map_transport(e: reqwest::Error) -> LogError {
    if e.is_timeout() {
        LogError::DeadlineExceeded
    } else {
        LogError::Unavailable(e.to_string())
    }
}

async fn error_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => format!("status {}", status),
    }
}

/// Log service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLogClient {
    base_url: String,
    client: Client,
    auth_token: Option<String>,
}

impl HttpLogClient {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> LogResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| LogError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client,
            auth_token: None,
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        deadline: Duration,
    ) -> LogResult<reqwest::Response> {
        let req = self.authorize(req).timeout(deadline);
        match tokio::time::timeout(deadline, req.send()).await {
            Ok(res) => res.map_err(map_transport),
            Err(_) => Err(LogError::DeadlineExceeded),
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        deadline: Duration,
    ) -> LogResult<T> {
        match tokio::time::timeout(deadline, resp.json::<T>()).await {
            Ok(res) => res.map_err(map_transport),
            Err(_) => Err(LogError::DeadlineExceeded),
        }
    }

    /// Proof for the earliest leaf whose hash is `leaf`, against `root`.
    pub async fn prove_by_hash(
        &self,
        leaf: &Digest,
        root: &LogRoot,
        deadline: Duration,
    ) -> LogResult<InclusionProof> {
        let url = format!(
            "{}/v1/log/proof-by-hash?leaf_hash={}&tree_size={}&root_hash={}",
            self.base_url,
            digest_to_hex(leaf),
            root.size,
            digest_to_hex(&root.root_hash)
        );
        let started = tokio::time::Instant::now();

        let resp = self.send(self.client.get(&url), deadline).await?;
        match resp.status() {
            s if s.is_success() => {
                Self::read_json(resp, deadline.saturating_sub(started.elapsed())).await
            }
            StatusCode::NOT_FOUND => Err(LogError::NotFound {
                leaf_index: root.size,
                tree_size: root.size,
            }),
            StatusCode::CONFLICT => Err(LogError::UnknownRoot { size: root.size }),
            _ => Err(LogError::Unavailable(error_message(resp).await)),
        }
    }
}

#[async_trait]
impl LogClient for HttpLogClient {
    async fn log(&self, entry: &Entry, deadline: Duration) -> LogResult<AppendReceipt> {
        entry.validate()?;

        let url = format!("{}/v1/log/append", self.base_url);
        let body = AppendRequest { entry: entry.clone() };
        let started = tokio::time::Instant::now();

        let resp = self.send(self.client.post(&url).json(&body), deadline).await?;
        match resp.status() {
            s if s.is_success() => {
                let left = deadline.saturating_sub(started.elapsed());
                Self::read_json(resp, left).await
            }
            StatusCode::BAD_REQUEST => Err(LogError::InvalidEntry(error_message(resp).await)),
            StatusCode::GATEWAY_TIMEOUT => Err(LogError::DeadlineExceeded),
            _ => Err(LogError::Unavailable(error_message(resp).await)),
        }
    }

    async fn current_root(&self, deadline: Duration) -> LogResult<LogRoot> {
        let url = format!("{}/v1/log/root", self.base_url);
        let started = tokio::time::Instant::now();

        let resp = self.send(self.client.get(&url), deadline).await?;
        if !resp.status().is_success() {
            return Err(LogError::Unavailable(error_message(resp).await));
        }
        Self::read_json(resp, deadline.saturating_sub(started.elapsed())).await
    }

    async fn prove_inclusion(
        &self,
        leaf_index: u64,
        root: &LogRoot,
        deadline: Duration,
    ) -> LogResult<InclusionProof> {
        let url = format!(
            "{}/v1/log/proof?leaf_index={}&tree_size={}&root_hash={}",
            self.base_url,
            leaf_index,
            root.size,
            digest_to_hex(&root.root_hash)
        );
        let started = tokio::time::Instant::now();

        let resp = self.send(self.client.get(&url), deadline).await?;
        match resp.status() {
            s if s.is_success() => {
                Self::read_json(resp, deadline.saturating_sub(started.elapsed())).await
            }
            StatusCode::NOT_FOUND => Err(LogError::NotFound {
                leaf_index,
                tree_size: root.size,
            }),
            StatusCode::CONFLICT => Err(LogError::UnknownRoot { size: root.size }),
            _ => Err(LogError::Unavailable(error_message(resp).await)),
        }
    }
}

/// In-process client over a shared `VerifiableLog`.
///
/// Appends run on the blocking pool since storage may fsync.
pub struct LocalLogClient<S: LogStorage + 'static> {
    log: Arc<VerifiableLog<S>>,
    attach_proofs: bool,
}

impl<S: LogStorage + 'static> Clone for LocalLogClient<S> {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            attach_proofs: self.attach_proofs,
        }
    }
}

impl<S: LogStorage + 'static> LocalLogClient<S> {
    pub fn new(log: Arc<VerifiableLog<S>>) -> Self {
        Self {
            log,
            attach_proofs: true,
        }
    }

    /// Answer appends with root and index only, like a log that hands out
    /// proofs on request.
    pub fn without_proofs(mut self) -> Self {
        self.attach_proofs = false;
        self
    }

    pub fn log_handle(&self) -> &Arc<VerifiableLog<S>> {
        &self.log
    }
}

#[async_trait]
impl<S: LogStorage + 'static> LogClient for LocalLogClient<S> {
    async fn log(&self, entry: &Entry, deadline: Duration) -> LogResult<AppendReceipt> {
        entry.validate()?;

        let log = self.log.clone();
        let entry = entry.clone();
        let attach_proofs = self.attach_proofs;

        let task = tokio::task::spawn_blocking(move || {
            if attach_proofs {
                log.append_with_proof(entry)
            } else {
                log.append(entry).map(|(root, leaf_index)| AppendReceipt {
                    root,
                    leaf_index,
                    proof: None,
                })
            }
        });

        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(res)) => res,
            Ok(Err(e)) => Err(LogError::Unavailable(format!("append task failed: {}", e))),
            Err(_) => Err(LogError::DeadlineExceeded),
        }
    }

    async fn current_root(&self, _deadline: Duration) -> LogResult<LogRoot> {
        Ok(self.log.current_root())
    }

    async fn prove_inclusion(
        &self,
        leaf_index: u64,
        root: &LogRoot,
        _deadline: Duration,
    ) -> LogResult<InclusionProof> {
        self.log.prove_inclusion(leaf_index, root)
    }
}
