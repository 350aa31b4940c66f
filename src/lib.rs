// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! ledgerpost-kernel: append-only, Merkle-backed log with inclusion proofs.

pub mod error;
pub mod hash;
pub mod entry;
pub mod types;
pub mod merkle;
pub mod storage;
pub mod log;
pub mod verify;

pub use entry::Entry;
pub use error::{LogError, LogResult};
pub use hash::Digest;
pub use log::VerifiableLog;
pub use storage::{LogStorage, MemoryStorage};
pub use types::{AppendReceipt, InclusionProof, LogRoot};
pub use verify::InclusionVerifier;
