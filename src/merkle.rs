// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Merkle Tree (RFC 6962 shape, BLAKE3 hash)
//!
//! ```text
//! MTH({})      = empty_root()
//! MTH({d0})    = leaf_hash(d0)
//! MTH(D[n])    = node_hash(MTH(D[0:k]), MTH(D[k:n]))   k = largest power of two < n
//! ```
//!
//! Complete subtrees never change once filled, so every one of them is
//! cached by level: `levels[h][i]` is the hash of leaves
//! `i * 2^h .. (i + 1) * 2^h`. Roots and audit paths for any historical size
//! are then assembled from O(log n) cached nodes.

use crate::hash::{empty_root, node_hash, Digest};

/// Largest power of two strictly less than `n`. Requires `n > 1`.
pub(crate) fn split_point(n: u64) -> u64 {
    debug_assert!(n > 1);
    1u64 << (63 - (n - 1).leading_zeros())
}

#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// Never empty: `levels[0]` holds the leaves.
    levels: Vec<Vec<Digest>>,
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MerkleTree {
    pub fn new() -> Self {
        Self { levels: vec![Vec::new()] }
    }

    /// Number of leaves.
    pub fn size(&self) -> u64 {
        self.levels[0].len() as u64
    }

    /// Append a leaf hash, filling any subtrees it completes.
    /// Returns the leaf's index.
    pub fn push(&mut self, leaf: Digest) -> u64 {
        let index = self.size();
        self.levels[0].push(leaf);

        let mut level = 0;
        let mut width = index + 1;
        while width % 2 == 0 {
            let row = &self.levels[level];
            let parent = node_hash(&row[row.len() - 2], &row[row.len() - 1]);
            level += 1;
            if self.levels.len() == level {
                self.levels.push(Vec::new());
            }
            self.levels[level].push(parent);
            width /= 2;
        }

        index
    }

    /// Current root.
    pub fn root(&self) -> Digest {
        self.root_at(self.size()).unwrap_or_else(empty_root)
    }

    /// Root of the first `size` leaves. `None` if `size` exceeds the tree.
    pub fn root_at(&self, size: u64) -> Option<Digest> {
        if size > self.size() {
            return None;
        }
        if size == 0 {
            return Some(empty_root());
        }
        Some(self.subtree_hash(0, size))
    }

    /// Audit path for `index` in the tree of the first `size` leaves.
    pub fn audit_path(&self, index: u64, size: u64) -> Option<Vec<Digest>> {
        if index >= size || size > self.size() {
            return None;
        }
        let mut path = Vec::new();
        self.collect_path(index, 0, size, &mut path);
        Some(path)
    }

    fn collect_path(&self, index: u64, start: u64, len: u64, out: &mut Vec<Digest>) {
        if len <= 1 {
            return;
        }
        let k = split_point(len);
        if index < k {
            self.collect_path(index, start, k, out);
            out.push(self.subtree_hash(start + k, len - k));
        } else {
            self.collect_path(index - k, start + k, len - k, out);
            out.push(self.subtree_hash(start, k));
        }
    }

    /// MTH of leaves `start .. start + len`. `len > 0`, range within the tree.
    fn subtree_hash(&self, start: u64, len: u64) -> Digest {
        if len.is_power_of_two() && start % len == 0 {
            let level = len.trailing_zeros() as usize;
            if let Some(hash) = self
                .levels
                .get(level)
                .and_then(|row| row.get((start / len) as usize))
            {
                return *hash;
            }
        }
        let k = split_point(len);
        node_hash(
            &self.subtree_hash(start, k),
            &self.subtree_hash(start + k, len - k),
        )
    }
}

/// Recompute a root from a leaf hash and its audit path.
///
/// Returns `None` when the path cannot belong to `(index, size)`: index out
/// of range, too few or too many siblings.
pub fn root_from_audit_path(
    leaf: &Digest,
    index: u64,
    size: u64,
    path: &[Digest],
) -> Option<Digest> {
    if index >= size {
        return None;
    }

    let mut fnode = index;
    let mut snode = size - 1;
    let mut hash = *leaf;

    for sibling in path {
        if snode == 0 {
            return None;
        }
        if fnode & 1 == 1 || fnode == snode {
            hash = node_hash(sibling, &hash);
            while fnode & 1 == 0 && fnode != 0 {
                fnode >>= 1;
                snode >>= 1;
            }
        } else {
            hash = node_hash(&hash, sibling);
        }
        fnode >>= 1;
        snode >>= 1;
    }

    if snode != 0 {
        return None;
    }
    Some(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::leaf_hash;

    /// Straight recursive MTH, the reference the cached tree must agree with.
    fn naive_root(leaves: &[Digest]) -> Digest {
        match leaves.len() {
            0 => empty_root(),
            1 => leaves[0],
            n => {
                let k = split_point(n as u64) as usize;
                node_hash(&naive_root(&leaves[..k]), &naive_root(&leaves[k..]))
            }
        }
    }

    fn leaves(n: usize) -> Vec<Digest> {
        (0..n).map(|i| leaf_hash(&(i as u64).to_le_bytes())).collect()
    }

    #[test]
    fn test_split_point() {
        assert_eq!(split_point(2), 1);
        assert_eq!(split_point(3), 2);
        assert_eq!(split_point(4), 2);
        assert_eq!(split_point(5), 4);
        assert_eq!(split_point(8), 4);
        assert_eq!(split_point(9), 8);
    }

    #[test]
    fn test_root_matches_naive_for_every_size() {
        let all = leaves(33);
        let mut tree = MerkleTree::new();
        assert_eq!(tree.root(), empty_root());

        for (i, leaf) in all.iter().enumerate() {
            assert_eq!(tree.push(*leaf), i as u64);
            assert_eq!(tree.root(), naive_root(&all[..=i]), "size {}", i + 1);
        }

        // Historical roots stay reachable
        for size in 0..=all.len() {
            assert_eq!(tree.root_at(size as u64), Some(naive_root(&all[..size])));
        }
        assert_eq!(tree.root_at(34), None);
    }

    #[test]
    fn test_every_path_recomputes_its_root() {
        let all = leaves(17);
        let mut tree = MerkleTree::new();
        for leaf in &all {
            tree.push(*leaf);
        }

        for size in 1..=17u64 {
            let root = tree.root_at(size).unwrap();
            for index in 0..size {
                let path = tree.audit_path(index, size).unwrap();
                let computed = root_from_audit_path(&all[index as usize], index, size, &path);
                assert_eq!(computed, Some(root), "index {} size {}", index, size);
            }
        }
    }

    #[test]
    fn test_malformed_paths_rejected() {
        let all = leaves(6);
        let mut tree = MerkleTree::new();
        for leaf in &all {
            tree.push(*leaf);
        }
        let path = tree.audit_path(2, 6).unwrap();

        // Truncated
        assert_eq!(root_from_audit_path(&all[2], 2, 6, &path[..path.len() - 1]), None);

        // Extended
        let mut long = path.clone();
        long.push([0u8; 32]);
        assert_eq!(root_from_audit_path(&all[2], 2, 6, &long), None);

        // Index out of range
        assert_eq!(root_from_audit_path(&all[2], 6, 6, &path), None);
        assert_eq!(tree.audit_path(6, 6), None);
        assert_eq!(tree.audit_path(0, 7), None);
    }

    #[test]
    fn test_single_leaf_has_empty_path() {
        let mut tree = MerkleTree::new();
        let leaf = leaf_hash(b"only");
        tree.push(leaf);

        assert_eq!(tree.audit_path(0, 1), Some(vec![]));
        assert_eq!(root_from_audit_path(&leaf, 0, 1, &[]), Some(leaf));
    }
}
