// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// Entry failed local validation. Never reaches the network.
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),
    /// The log (or its storage) could not record or answer.
    #[error("Log unavailable: {0}")]
    Unavailable(String),
    /// Budget exhausted before the log answered.
    #[error("Deadline exceeded")]
    DeadlineExceeded,
    /// Proof requested for an index the root does not cover.
    #[error("Leaf {leaf_index} not found in tree of size {tree_size}")]
    NotFound { leaf_index: u64, tree_size: u64 },
    /// The root hash does not match what this log committed at that size.
    #[error("Unknown root at size {size}")]
    UnknownRoot { size: u64 },
}

pub type LogResult<T> = core::result::Result<T, LogError>;
