// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Delivery Pipeline - Log Before Forward
//!
//! ```text
//! Entry
//! ↓
//! 1. Validate         (local, no I/O)          -> LogFailed(InvalidEntry)
//! ↓
//! 2. Log              (LogClient::log)         -> LogFailed(reason)
//! ↓
//! 3. Verify, optional (InclusionVerifier)      -> ProofFailed(NoProof | Mismatch | ...)
//! ↓
//! 4. Forward          (DeliverySink::deliver)  -> ForwardFailed(reason)
//! ↓
//! Delivered
//! ```
//!
//! # Invariants
//! - a message is never forwarded unless the log step succeeded
//! - with verification on, never forwarded unless its proof checked out
//! - exactly one terminal result per entry, no stage retried
//! - stages 2-4 share one budget; when it runs out (or the caller cancels)
//!   the in-flight stage is dropped and nothing runs after it

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ledgerpost_kernel::{AppendReceipt, Entry, InclusionVerifier, LogError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::errors::DeliveryError;
use crate::network::{DeliverySink, LogClient};

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFailure {
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
    #[error("log unavailable: {0}")]
    Unavailable(String),
    #[error("deadline exceeded while logging")]
    DeadlineExceeded,
    #[error("cancelled while logging")]
    Cancelled,
}

impl From<LogError> for LogFailure {
    fn from(e: LogError) -> Self {
        match e {
            LogError::InvalidEntry(reason) => LogFailure::InvalidEntry(reason),
            LogError::Unavailable(reason) => LogFailure::Unavailable(reason),
            LogError::DeadlineExceeded => LogFailure::DeadlineExceeded,
            other => LogFailure::Unavailable(other.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofFailure {
    #[error("no inclusion proof available")]
    NoProof,
    #[error("inclusion proof does not match the log root")]
    Mismatch,
    #[error("proof fetch failed: {0}")]
    Unavailable(String),
    #[error("deadline exceeded while verifying")]
    DeadlineExceeded,
    #[error("cancelled while verifying")]
    Cancelled,
}

impl From<LogError> for ProofFailure {
    fn from(e: LogError) -> Self {
        match e {
            LogError::NotFound { .. } => ProofFailure::NoProof,
            // The log disowns the root it just handed us
            LogError::UnknownRoot { .. } => ProofFailure::Mismatch,
            LogError::DeadlineExceeded => ProofFailure::DeadlineExceeded,
            other => ProofFailure::Unavailable(other.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardFailure {
    #[error("delivery rejected: {0}")]
    Rejected(String),
    #[error("delivery unavailable: {0}")]
    Unavailable(String),
    #[error("deadline exceeded while forwarding")]
    DeadlineExceeded,
    #[error("cancelled while forwarding")]
    Cancelled,
}

impl From<DeliveryError> for ForwardFailure {
    fn from(e: DeliveryError) -> Self {
        match e {
            DeliveryError::Rejected(reason) => ForwardFailure::Rejected(reason),
            DeliveryError::Unavailable(reason) => ForwardFailure::Unavailable(reason),
            DeliveryError::DeadlineExceeded => ForwardFailure::DeadlineExceeded,
        }
    }
}

/// Terminal outcome of one send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineResult {
    /// Logged (and verified, if enabled) then accepted downstream.
    Delivered(AppendReceipt),
    LogFailed(LogFailure),
    ProofFailed(ProofFailure),
    ForwardFailed(ForwardFailure),
}

impl PipelineResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, PipelineResult::Delivered(_))
    }

    pub fn receipt(&self) -> Option<&AppendReceipt> {
        match self {
            PipelineResult::Delivered(receipt) => Some(receipt),
            _ => None,
        }
    }

    /// Metric label.
    pub fn outcome(&self) -> &'static str {
        match self {
            PipelineResult::Delivered(_) => "delivered",
            PipelineResult::LogFailed(_) => "log_failed",
            PipelineResult::ProofFailed(_) => "proof_failed",
            PipelineResult::ForwardFailed(_) => "forward_failed",
        }
    }
}

impl std::fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineResult::Delivered(r) => write!(f, "delivered (leaf {} of {})", r.leaf_index, r.root.size),
            PipelineResult::LogFailed(e) => write!(f, "log failed: {}", e),
            PipelineResult::ProofFailed(e) => write!(f, "proof failed: {}", e),
            PipelineResult::ForwardFailed(e) => write!(f, "forward failed: {}", e),
        }
    }
}

/// What a batch does after one entry fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    #[default]
    ContinueOnError,
    AbortOnFailure,
}

enum Stage<T> {
    Done(T),
    TimedOut,
    Cancelled,
}

/// Drive one stage future until it finishes, the budget runs out or the
/// caller cancels. The future is dropped in the latter two cases.
async fn run_stage<F: Future>(deadline: Instant, cancel: &CancellationToken, fut: F) -> Stage<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Stage::Cancelled,
        res = tokio::time::timeout_at(deadline, fut) => match res {
            Ok(out) => Stage::Done(out),
            Err(_) => Stage::TimedOut,
        },
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Build an entry stamped with the current time.
pub fn new_entry(author: impl Into<String>, payload: impl Into<String>) -> Entry {
    let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
    Entry::new(author, payload, now)
}

#[derive(Clone)]
pub struct DeliveryPipeline {
    log: Arc<dyn LogClient>,
    sink: Arc<dyn DeliverySink>,
    config: PipelineConfig,
}

impl DeliveryPipeline {
    pub fn new(log: Arc<dyn LogClient>, sink: Arc<dyn DeliverySink>, config: PipelineConfig) -> Self {
        Self { log, sink, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Log, optionally verify, then forward one entry.
    pub async fn send(&self, entry: Entry) -> PipelineResult {
        self.send_with_cancel(entry, CancellationToken::new()).await
    }

    /// As [`DeliveryPipeline::send`]; cancelling `cancel` abandons whichever
    /// stage is in flight.
    pub async fn send_with_cancel(&self, entry: Entry, cancel: CancellationToken) -> PipelineResult {
        let started = std::time::Instant::now();
        tracing::info!("Sending message from '{}' ({} bytes)", entry.author, entry.payload.len());

        let result = self.run(&entry, &cancel).await;

        metrics::increment_counter!("ledgerpost_pipeline_results_total", "outcome" => result.outcome());
        metrics::histogram!("ledgerpost_pipeline_duration_seconds", started.elapsed().as_secs_f64());

        match &result {
            PipelineResult::Delivered(receipt) => tracing::info!(
                "Delivered: leaf {} in root of size {}",
                receipt.leaf_index,
                receipt.root.size
            ),
            other => tracing::warn!("Send failed: {}", other),
        }
        result
    }

    async fn run(&self, entry: &Entry, cancel: &CancellationToken) -> PipelineResult {
        // Step 1: Validate locally. Nothing leaves the process for a bad entry.
        if let Err(e) = entry.validate() {
            return PipelineResult::LogFailed(e.into());
        }

        let verify_proof = self.config.verify_proof;
        let deadline = Instant::now() + self.config.send_timeout;

        // Step 2: Log. Must succeed before anything else happens.
        let receipt = match run_stage(deadline, cancel, self.log.log(entry, remaining(deadline))).await {
            Stage::Done(Ok(receipt)) => receipt,
            Stage::Done(Err(e)) => return PipelineResult::LogFailed(e.into()),
            Stage::TimedOut => return PipelineResult::LogFailed(LogFailure::DeadlineExceeded),
            Stage::Cancelled => return PipelineResult::LogFailed(LogFailure::Cancelled),
        };
        tracing::debug!("Logged at leaf {} (root size {})", receipt.leaf_index, receipt.root.size);

        // Step 3: Verify, if the policy asks for it
        if verify_proof {
            if let Err(failure) = self.verify(entry, &receipt, deadline, cancel).await {
                return PipelineResult::ProofFailed(failure);
            }
        }

        // Step 4: Forward
        if Instant::now() >= deadline {
            return PipelineResult::ForwardFailed(ForwardFailure::DeadlineExceeded);
        }
        match run_stage(deadline, cancel, self.sink.deliver(&entry.payload, remaining(deadline))).await {
            Stage::Done(Ok(())) => PipelineResult::Delivered(receipt),
            Stage::Done(Err(e)) => PipelineResult::ForwardFailed(e.into()),
            Stage::TimedOut => PipelineResult::ForwardFailed(ForwardFailure::DeadlineExceeded),
            Stage::Cancelled => PipelineResult::ForwardFailed(ForwardFailure::Cancelled),
        }
    }

    async fn verify(
        &self,
        entry: &Entry,
        receipt: &AppendReceipt,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<(), ProofFailure> {
        let proof = match &receipt.proof {
            Some(proof) => proof.clone(),
            None if !self.config.fetch_missing_proof => return Err(ProofFailure::NoProof),
            None => {
                let fetch = self
                    .log
                    .prove_inclusion(receipt.leaf_index, &receipt.root, remaining(deadline));
                match run_stage(deadline, cancel, fetch).await {
                    Stage::Done(Ok(proof)) => proof,
                    Stage::Done(Err(e)) => return Err(e.into()),
                    Stage::TimedOut => return Err(ProofFailure::DeadlineExceeded),
                    Stage::Cancelled => return Err(ProofFailure::Cancelled),
                }
            }
        };

        if InclusionVerifier::verify(entry, receipt.leaf_index, &receipt.root, &proof) {
            Ok(())
        } else {
            tracing::warn!("Proof for leaf {} did not verify", receipt.leaf_index);
            Err(ProofFailure::Mismatch)
        }
    }

    /// Send entries one after another.
    ///
    /// Returns one result per entry attempted; with `AbortOnFailure` the
    /// entries after the first failure are not attempted.
    pub async fn send_batch(&self, entries: Vec<Entry>, policy: BatchPolicy) -> Vec<PipelineResult> {
        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            let result = self.send(entry).await;
            let failed = !result.is_delivered();
            results.push(result);
            if failed && policy == BatchPolicy::AbortOnFailure {
                tracing::warn!("Aborting batch after {} of its entries", results.len());
                break;
            }
        }
        results
    }

    /// Send every entry on its own task. Results come back in input order.
    ///
    /// The tasks belong to the returned future: dropping it aborts every
    /// send still in flight, forward stage included.
    pub async fn send_concurrent(&self, entries: Vec<Entry>) -> Vec<PipelineResult> {
        let mut tasks = JoinSet::new();
        let mut results: Vec<Option<PipelineResult>> = vec![None; entries.len()];

        for (slot, entry) in entries.into_iter().enumerate() {
            let pipeline = self.clone();
            tasks.spawn(async move { (slot, pipeline.send(entry).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, result)) => results[slot] = Some(result),
                Err(e) => tracing::error!("Send task failed: {}", e),
            }
        }

        results
            .into_iter()
            .map(|result| {
                result.unwrap_or_else(|| {
                    PipelineResult::LogFailed(LogFailure::Unavailable("send task failed".to_string()))
                })
            })
            .collect()
    }
}
