// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Verifiable Log
//!
//! Append-only sequence of entries with a Merkle root recomputed on every
//! append and inclusion proofs against any root the log has published.
//!
//! # Append protocol
//! ```text
//! append(entry)
//! ↓
//! 1. validate (author/payload non-empty)
//! ↓
//! 2. take the append lock        <- single ordering point
//! ↓
//! 3. persist through LogStorage  <- failure: tree untouched, Unavailable
//! ↓
//! 4. push leaf, recompute root
//! ↓
//! 5. release; return (root, leaf_index)
//! ```
//!
//! # Invariants
//! - leaf indices are handed out as 0, 1, 2, ... with no gaps or reuse
//! - the root published at a size never changes
//! - nothing is visible in the tree before storage accepted it

use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rustc_hash::FxHashMap;

use crate::entry::Entry;
use crate::error::{LogError, LogResult};
use crate::hash::Digest;
use crate::merkle::MerkleTree;
use crate::storage::{LogStorage, MemoryStorage};
use crate::types::{AppendReceipt, InclusionProof, LogRoot};

#[derive(Debug, Default)]
struct TreeState {
    tree: MerkleTree,
    entries: Vec<Entry>,
    /// First leaf index for each leaf hash. Duplicates keep the earliest.
    first_index: FxHashMap<Digest, u64>,
}

impl TreeState {
    fn push(&mut self, entry: Entry, leaf: Digest) -> u64 {
        let index = self.tree.push(leaf);
        self.entries.push(entry);
        self.first_index.entry(leaf).or_insert(index);
        index
    }

    fn root(&self) -> LogRoot {
        LogRoot {
            size: self.tree.size(),
            root_hash: self.tree.root(),
        }
    }

    /// Check that `root` is a root this log actually published.
    fn check_root(&self, root: &LogRoot) -> LogResult<()> {
        match self.tree.root_at(root.size) {
            Some(hash) if hash == root.root_hash => Ok(()),
            _ => Err(LogError::UnknownRoot { size: root.size }),
        }
    }

    fn prove(&self, leaf_index: u64, root: &LogRoot) -> LogResult<InclusionProof> {
        if leaf_index >= root.size || root.size > self.tree.size() {
            return Err(LogError::NotFound {
                leaf_index,
                tree_size: root.size,
            });
        }
        self.check_root(root)?;

        let audit_path = self
            .tree
            .audit_path(leaf_index, root.size)
            .ok_or(LogError::NotFound {
                leaf_index,
                tree_size: root.size,
            })?;

        Ok(InclusionProof {
            leaf_index,
            tree_size: root.size,
            audit_path,
        })
    }
}

pub struct VerifiableLog<S: LogStorage = MemoryStorage> {
    /// Held across persist + extend. The only writer of `state`.
    storage: Mutex<S>,
    state: RwLock<TreeState>,
}

impl VerifiableLog<MemoryStorage> {
    pub fn in_memory() -> Self {
        Self {
            storage: Mutex::new(MemoryStorage::new()),
            state: RwLock::new(TreeState::default()),
        }
    }
}

impl<S: LogStorage> VerifiableLog<S> {
    /// Open a log over `storage`, rebuilding the tree from whatever it
    /// already holds.
    pub fn open(mut storage: S) -> LogResult<Self> {
        let mut state = TreeState::default();
        for entry in storage.load()? {
            let leaf = entry.leaf_hash()?;
            state.push(entry, leaf);
        }

        Ok(Self {
            storage: Mutex::new(storage),
            state: RwLock::new(state),
        })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, TreeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate, persist, then extend the tree.
    ///
    /// The storage lock is held until the tree write lock is taken, so tree
    /// order is storage order. The returned guard shows the tree exactly as
    /// this append left it.
    fn commit(&self, entry: Entry) -> LogResult<(RwLockWriteGuard<'_, TreeState>, u64)> {
        entry.validate()?;
        let leaf = entry.leaf_hash()?;

        let mut storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);

        // Persist FIRST. A failure here leaves the tree exactly as it was.
        storage.append(&entry)?;

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let index = state.push(entry, leaf);
        Ok((state, index))
    }

    /// Append an entry. Returns the new root and the entry's leaf index.
    ///
    /// Only returns `Ok` after storage has durably accepted the entry.
    pub fn append(&self, entry: Entry) -> LogResult<(LogRoot, u64)> {
        let (state, index) = self.commit(entry)?;
        Ok((state.root(), index))
    }

    /// Append and attach an inclusion proof against the resulting root.
    pub fn append_with_proof(&self, entry: Entry) -> LogResult<AppendReceipt> {
        let (state, leaf_index) = self.commit(entry)?;
        let root = state.root();
        let proof = state.prove(leaf_index, &root)?;

        Ok(AppendReceipt {
            root,
            leaf_index,
            proof: Some(proof),
        })
    }

    /// Most recently committed root.
    pub fn current_root(&self) -> LogRoot {
        self.read_state().root()
    }

    pub fn size(&self) -> u64 {
        self.read_state().tree.size()
    }

    /// Root the log published when it held `size` entries.
    pub fn root_at(&self, size: u64) -> LogResult<LogRoot> {
        let state = self.read_state();
        let root_hash = state.tree.root_at(size).ok_or(LogError::NotFound {
            leaf_index: size,
            tree_size: state.tree.size(),
        })?;
        Ok(LogRoot { size, root_hash })
    }

    /// Inclusion proof for `leaf_index` against `root`.
    ///
    /// `NotFound` when the index is outside `root.size` (or `root.size` is
    /// beyond what has been committed); `UnknownRoot` when `root.root_hash`
    /// is not what this log had at that size. The same `(leaf_index, root)`
    /// always yields the same path.
    pub fn prove_inclusion(&self, leaf_index: u64, root: &LogRoot) -> LogResult<InclusionProof> {
        self.read_state().prove(leaf_index, root)
    }

    /// Proof for the first leaf whose hash is `leaf`.
    pub fn prove_by_hash(&self, leaf: &Digest, root: &LogRoot) -> LogResult<InclusionProof> {
        let state = self.read_state();
        let leaf_index = match state.first_index.get(leaf) {
            Some(&index) if index < root.size => index,
            _ => {
                return Err(LogError::NotFound {
                    leaf_index: root.size,
                    tree_size: root.size,
                })
            }
        };
        state.prove(leaf_index, root)
    }

    pub fn entry(&self, leaf_index: u64) -> Option<Entry> {
        self.read_state().entries.get(leaf_index as usize).cloned()
    }
}

impl Default for VerifiableLog<MemoryStorage> {
    fn default() -> Self {
        Self::in_memory()
    }
}
