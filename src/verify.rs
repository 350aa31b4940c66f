// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Inclusion Verification.
//!
//! Pure functions: no I/O, no shared state. A proof that cannot be
//! checked (wrong path length, index outside the tree, proof issued for a
//! different index or size) is a failed verification, not an error.

use crate::entry::Entry;
use crate::hash::Digest;
use crate::merkle;
use crate::types::{InclusionProof, LogRoot};

/// Confirms or rejects that `entry` sits at `leaf_index` under `root`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InclusionVerifier;

impl InclusionVerifier {
    pub fn verify(entry: &Entry, leaf_index: u64, root: &LogRoot, proof: &InclusionProof) -> bool {
        match entry.leaf_hash() {
            Ok(leaf) => Self::verify_leaf(&leaf, leaf_index, root, proof),
            Err(_) => false,
        }
    }

    /// Same as [`InclusionVerifier::verify`] for a precomputed leaf hash.
    pub fn verify_leaf(leaf: &Digest, leaf_index: u64, root: &LogRoot, proof: &InclusionProof) -> bool {
        if proof.leaf_index != leaf_index || proof.tree_size != root.size {
            return false;
        }
        match merkle::root_from_audit_path(leaf, leaf_index, root.size, &proof.audit_path) {
            Some(computed) => computed == root.root_hash,
            None => false,
        }
    }
}
