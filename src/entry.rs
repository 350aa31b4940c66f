// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Log Entries
//!
//! An `Entry` is the atomic unit appended to the log. Its identity is its
//! canonical byte encoding (bincode, standard config): two entries with the
//! same author, payload and timestamp are the same leaf as far as the log is
//! concerned.

use serde::{Deserialize, Serialize};

use crate::error::{LogError, LogResult};
use crate::hash::{leaf_hash, Digest};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Entry {
    /// Submitting principal.
    pub author: String,
    /// Message body.
    pub payload: String,
    /// Unix milliseconds, assigned by the client at creation.
    pub timestamp_ms: u64,
}

impl Entry {
    pub fn new(author: impl Into<String>, payload: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            author: author.into(),
            payload: payload.into(),
            timestamp_ms,
        }
    }

    /// Reject entries the log must never see.
    pub fn validate(&self) -> LogResult<()> {
        if self.author.is_empty() {
            return Err(LogError::InvalidEntry("author required".to_string()));
        }
        if self.payload.is_empty() {
            return Err(LogError::InvalidEntry("payload required".to_string()));
        }
        Ok(())
    }

    /// Canonical encoding. This is what gets hashed and persisted.
    pub fn to_bytes(&self) -> LogResult<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| LogError::InvalidEntry(format!("encode failed: {}", e)))
    }

    /// Decode a canonical encoding. Trailing bytes are rejected so that one
    /// entry has exactly one encoding.
    pub fn from_bytes(bytes: &[u8]) -> LogResult<Self> {
        let (entry, read): (Entry, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| LogError::InvalidEntry(format!("decode failed: {}", e)))?;

        if read != bytes.len() {
            return Err(LogError::InvalidEntry(format!(
                "{} trailing bytes after entry",
                bytes.len() - read
            )));
        }
        Ok(entry)
    }

    /// Leaf digest of this entry in the Merkle tree.
    pub fn leaf_hash(&self) -> LogResult<Digest> {
        Ok(leaf_hash(&self.to_bytes()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_fields() {
        assert!(Entry::new("alice", "hello", 1).validate().is_ok());

        let err = Entry::new("bob", "", 1).validate().unwrap_err();
        assert!(matches!(err, LogError::InvalidEntry(_)));

        let err = Entry::new("", "hello", 1).validate().unwrap_err();
        assert!(matches!(err, LogError::InvalidEntry(_)));
    }

    #[test]
    fn test_encoding_is_canonical() {
        let entry = Entry::new("alice", "hello", 42);
        let bytes = entry.to_bytes().unwrap();

        assert_eq!(Entry::from_bytes(&bytes).unwrap(), entry);
        assert_eq!(entry.to_bytes().unwrap(), bytes);

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(Entry::from_bytes(&padded).is_err());
    }

    #[test]
    fn test_identity_is_content() {
        let a = Entry::new("alice", "hello", 42);
        let b = Entry::new("alice", "hello", 42);
        let c = Entry::new("alice", "hello", 43);

        assert_eq!(a.leaf_hash().unwrap(), b.leaf_hash().unwrap());
        assert_ne!(a.leaf_hash().unwrap(), c.leaf_hash().unwrap());
    }
}
