// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Storage seam for the verifiable log.
//!
//! The log keeps its tree in memory; a `LogStorage` is where entries become
//! durable. `append` must not return `Ok` until the entry would survive a
//! crash, and `load` must return exactly the entries previously appended, in
//! order.

use crate::entry::Entry;
use crate::error::LogResult;

pub trait LogStorage: Send {
    /// Every entry persisted so far, in append order.
    fn load(&mut self) -> LogResult<Vec<Entry>>;

    /// Durably record one entry at the end of the log.
    ///
    /// On `Err` the storage must hold exactly what it held before the call;
    /// if it cannot guarantee that, it must fail every later append too.
    fn append(&mut self, entry: &Entry) -> LogResult<()>;
}

impl<T: LogStorage + ?Sized> LogStorage for Box<T> {
    fn load(&mut self) -> LogResult<Vec<Entry>> {
        (**self).load()
    }

    fn append(&mut self, entry: &Entry) -> LogResult<()> {
        (**self).append(entry)
    }
}

/// Volatile storage. Entries live as long as the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: Vec<Entry>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LogStorage for MemoryStorage {
    fn load(&mut self) -> LogResult<Vec<Entry>> {
        Ok(self.entries.clone())
    }

    fn append(&mut self, entry: &Entry) -> LogResult<()> {
        self.entries.push(entry.clone());
        Ok(())
    }
}
