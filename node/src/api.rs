// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use ledgerpost_kernel::Entry;
use serde::{Deserialize, Serialize};

// Append responses are `AppendReceipt`, roots are `LogRoot` and proofs are
// `InclusionProof`, all straight from the kernel.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendRequest {
    pub entry: Entry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofQuery {
    pub leaf_index: u64,
    pub tree_size: u64,
    /// Hex root hash the proof must be against. Defaults to the log's own
    /// root at `tree_size`.
    pub root_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofByHashQuery {
    /// Hex leaf hash. The earliest leaf with this hash is proven.
    pub leaf_hash: String,
    pub tree_size: u64,
    pub root_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverRequest {
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverResponse {
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveredMessage {
    pub payload: String,
    pub received_at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxResponse {
    pub messages: Vec<DeliveredMessage>,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
