// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use ledgerpost_kernel::LogError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Invalid magic bytes in header")]
    InvalidMagic,
    #[error("Unsupported log file version {0}")]
    UnsupportedVersion(u32),
    #[error("Checksum mismatch at offset {offset}: expected {expected:016x}, found {found:016x}")]
    ChecksumMismatch {
        offset: u64,
        expected: u64,
        found: u64,
    },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
    #[error("Log file {0:?} disabled after a failed rollback")]
    Disabled(PathBuf),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Anything storage-side means the log cannot vouch for the entry.
impl From<PersistenceError> for LogError {
    fn from(e: PersistenceError) -> Self {
        LogError::Unavailable(e.to_string())
    }
}
