// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical BLAKE3 Hashing
//!
//! Every digest that leaves the log is produced here. Leaves and interior
//! nodes are domain-separated with a one-byte prefix so a leaf can never be
//! replayed as an interior node:
//!
//! ```text
//! leaf_hash(d)    = BLAKE3(0x00 || d)
//! node_hash(l, r) = BLAKE3(0x01 || l || r)
//! empty root      = BLAKE3("")
//! ```

/// 32-byte BLAKE3 output.
pub type Digest = [u8; 32];

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Hash a leaf's canonical bytes.
pub fn leaf_hash(data: &[u8]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Hash two child digests into their parent.
pub fn node_hash(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

/// Root of the empty tree.
pub fn empty_root() -> Digest {
    *blake3::hash(&[]).as_bytes()
}

pub fn digest_to_hex(digest: &Digest) -> String {
    hex::encode(digest)
}

/// Parse a 64-char hex string. Returns `None` on bad length or characters.
pub fn digest_from_hex(s: &str) -> Option<Digest> {
    let bytes = hex::decode(s).ok()?;
    bytes.try_into().ok()
}
