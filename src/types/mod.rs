// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Log roots, inclusion proofs and append receipts.

use serde::{Deserialize, Serialize};

use crate::hash::{digest_to_hex, empty_root, Digest};

/// Summary of the log at a point in time.
///
/// For one log, the `(size, root_hash)` pairs observed over time are an
/// append-only sequence: a root is never revised once published at a size.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LogRoot {
    /// Entries committed so far.
    pub size: u64,
    /// Merkle tree hash over entries `0..size`.
    pub root_hash: Digest,
}

impl LogRoot {
    pub fn empty() -> Self {
        Self {
            size: 0,
            root_hash: empty_root(),
        }
    }

    pub fn root_hash_hex(&self) -> String {
        digest_to_hex(&self.root_hash)
    }
}

impl Default for LogRoot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Evidence that the leaf at `leaf_index` is in the tree of `tree_size`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InclusionProof {
    pub leaf_index: u64,
    pub tree_size: u64,
    /// Sibling digests, leaf level first.
    pub audit_path: Vec<Digest>,
}

/// What the log hands back for a successful append.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Root right after this entry was committed.
    pub root: LogRoot,
    pub leaf_index: u64,
    /// Present when the log attached a proof against `root`.
    pub proof: Option<InclusionProof>,
}
