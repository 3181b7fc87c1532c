//! Independent Merkle branch verification.
//!
//! Recomputes roots with plain sha256 so proofs produced by `beacon-proofs` are checked by code
//! that shares nothing with the prover beyond the hashing rule.

use sha2::{Digest, Sha256};

pub type Hash = [u8; 32];

/// Fold `proof` into `leaf` along the path encoded by `gindex`.
///
/// Returns `None` when the proof length does not match the gindex depth.
#[must_use]
pub fn compute_root(leaf: Hash, proof: &[Hash], gindex: u64) -> Option<Hash> {
    if gindex == 0 || proof.len() != (63 - gindex.leading_zeros()) as usize {
        return None;
    }

    let mut node = leaf;
    let mut index = gindex;
    for sibling in proof {
        let mut hasher = Sha256::new();
        if index & 1 == 0 {
            hasher.update(node);
            hasher.update(sibling);
        } else {
            hasher.update(sibling);
            hasher.update(node);
        }
        node = hasher.finalize().into();
        index >>= 1;
    }
    Some(node)
}

/// Whether `proof` links `leaf` at `gindex` to `root`.
#[must_use]
pub fn verify(leaf: Hash, proof: &[Hash], gindex: u64, root: Hash) -> bool {
    compute_root(leaf, proof, gindex) == Some(root)
}

/// `0x`-prefixed hex, as written in proof vector files.
#[must_use]
pub fn to_hex(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}
