//! Sparse Merkle Tree Engine
//!
//! Builds a node tree for a merkleized container and answers "give me the leaf and sibling path
//! for generalized index N". Large lists are not allocated at their virtual capacity: any
//! subtree with no populated leaves is a single zero-hash node of the right depth, the same
//! approach consensus clients use for `List<Validator, 2^40>`.
//!
//! Field and element roots come from `ssz_rs`'s `HashTreeRoot`. This module only arranges
//! those roots into the layout SSZ prescribes, so the root it produces must always match
//! `hash_tree_root()` for the same value.

use std::sync::OnceLock;

use sha2::{Digest, Sha256};
use ssz_rs::prelude::*;
use thiserror::Error;

use crate::gindex::{power_of_two_ceil, GeneralizedIndex, GindexCalculator};
use crate::layout::{field_count, Container};

/// A 32-byte Merkle node.
pub type Hash256 = [u8; 32];

/// Maximum supported tree depth
const MAX_DEPTH: usize = 64;

/// Errors raised while building a tree or extracting a proof from it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("SSZ merkleization failed: {0}")]
    Merkleization(String),

    #[error("invalid generalized index {0}")]
    InvalidGeneralizedIndex(GeneralizedIndex),

    #[error("generalized index {gindex} descends below a leaf at depth {depth}")]
    BelowLeaf { gindex: GeneralizedIndex, depth: u32 },

    #[error("{count} leaves do not fit in a subtree of depth {depth}")]
    TooManyLeaves { count: usize, depth: u32 },

    #[error("{container} built from {actual} fields, declared {expected}")]
    FieldCountMismatch {
        container: &'static str,
        expected: u64,
        actual: usize,
    },

    #[error("{container} has no field named {field}")]
    UnknownField {
        container: &'static str,
        field: &'static str,
    },

    #[error("expanded {container}.{field} root differs from its hash_tree_root")]
    SubtreeMismatch {
        container: &'static str,
        field: &'static str,
    },
}

impl From<MerkleizationError> for TreeError {
    fn from(e: MerkleizationError) -> Self {
        Self::Merkleization(e.to_string())
    }
}

/// Anything that can present itself as a Merkle tree.
pub trait Merkleized {
    /// Build the tree view of this value.
    ///
    /// # Errors
    /// Returns an error if hashing a field fails or the layout is inconsistent.
    fn tree(&self) -> Result<MerkleTree, TreeError>;
}

/// Leaf value and sibling path for one generalized index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeProof {
    /// Node value at the proven index
    pub leaf: Hash256,
    /// Sibling hashes from the leaf up to the tree root
    pub hashes: Vec<Hash256>,
}

#[derive(Debug, Clone)]
enum Kind {
    /// Opaque node: its hash is known, its children are not.
    Leaf,
    /// Root of an all-zero subtree of the given depth.
    Zero(u32),
    Branch(Box<MerkleTree>, Box<MerkleTree>),
}

/// A Merkle tree with every node hash cached.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    hash: Hash256,
    kind: Kind,
}

/// Precomputed zero hashes for each depth level.
/// `zero_hashes()[0]` is the zero leaf, `zero_hashes()[i] = hash(zh[i-1], zh[i-1])`.
fn zero_hashes() -> &'static [Hash256; MAX_DEPTH + 1] {
    static ZERO_HASHES: OnceLock<[Hash256; MAX_DEPTH + 1]> = OnceLock::new();
    ZERO_HASHES.get_or_init(|| {
        let mut hashes = [[0u8; 32]; MAX_DEPTH + 1];
        for i in 1..=MAX_DEPTH {
            hashes[i] = hash_pair(&hashes[i - 1], &hashes[i - 1]);
        }
        hashes
    })
}

/// Zero hash for a subtree of the given depth, at most 64.
#[must_use]
pub(crate) fn zero_hash(depth: u32) -> Hash256 {
    zero_hashes()[depth as usize]
}

/// SHA-256 hash of two 32-byte nodes
#[must_use]
pub fn hash_pair(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Length chunk mixed into a list root: little-endian length padded to 32 bytes.
#[must_use]
pub fn length_chunk(length: usize) -> Hash256 {
    let mut length_bytes = [0u8; 32];
    length_bytes[..8].copy_from_slice(&(length as u64).to_le_bytes());
    length_bytes
}

/// `hash_tree_root` of any SSZ value, as raw bytes.
///
/// # Errors
/// Propagates the `ssz_rs` merkleization error.
pub fn root_of<T: HashTreeRoot + ?Sized>(value: &T) -> Result<Hash256, TreeError> {
    Ok(value.hash_tree_root()?.into())
}

impl MerkleTree {
    /// An opaque node holding a precomputed root.
    #[must_use]
    pub fn leaf(hash: Hash256) -> Self {
        Self {
            hash,
            kind: Kind::Leaf,
        }
    }

    /// Opaque node holding the `hash_tree_root` of an SSZ value.
    ///
    /// # Errors
    /// Propagates the `ssz_rs` merkleization error.
    pub fn root_leaf<T: HashTreeRoot + ?Sized>(value: &T) -> Result<Self, TreeError> {
        Ok(Self::leaf(root_of(value)?))
    }

    /// Root of an all-zero subtree, at most 64 levels deep.
    #[must_use]
    pub(crate) fn zero(depth: u32) -> Self {
        Self {
            hash: zero_hash(depth),
            kind: Kind::Zero(depth),
        }
    }

    /// Parent of two subtrees.
    #[must_use]
    pub fn branch(left: Self, right: Self) -> Self {
        Self {
            hash: hash_pair(&left.hash, &right.hash),
            kind: Kind::Branch(Box::new(left), Box::new(right)),
        }
    }

    /// Arrange `leaves` left-aligned in a perfect subtree of `depth`, padding with zero subtrees.
    ///
    /// Built bottom-up, so only populated paths allocate nodes.
    ///
    /// # Errors
    /// Returns [`TreeError::TooManyLeaves`] if the leaves do not fit.
    pub fn from_leaves(leaves: Vec<Self>, depth: u32) -> Result<Self, TreeError> {
        if depth as usize > MAX_DEPTH || (depth < 64 && leaves.len() as u64 > 1u64 << depth) {
            return Err(TreeError::TooManyLeaves {
                count: leaves.len(),
                depth,
            });
        }
        if leaves.is_empty() {
            return Ok(Self::zero(depth));
        }

        let mut layer = leaves;
        for level in 0..depth {
            let mut parents = Vec::with_capacity(layer.len().div_ceil(2));
            let mut nodes = layer.into_iter();
            while let Some(left) = nodes.next() {
                let right = nodes.next().unwrap_or_else(|| Self::zero(level));
                parents.push(Self::branch(left, right));
            }
            layer = parents;
        }

        layer.pop().ok_or(TreeError::TooManyLeaves { count: 0, depth })
    }

    /// Tree of a container whose fields are given in declaration order.
    ///
    /// # Errors
    /// Returns [`TreeError::FieldCountMismatch`] if `fields` disagrees with `C`'s declared layout.
    pub fn container<C: Container>(fields: Vec<Self>) -> Result<Self, TreeError> {
        let expected = field_count::<C>();
        if fields.len() as u64 != expected {
            return Err(TreeError::FieldCountMismatch {
                container: C::NAME,
                expected,
                actual: fields.len(),
            });
        }
        Self::from_leaves(fields, depth_for(expected))
    }

    /// Tree of a fixed-length vector of composite (one node per element) items.
    ///
    /// # Errors
    /// Returns [`TreeError::TooManyLeaves`] if there are more elements than `capacity`.
    pub fn vector(elements: Vec<Self>, capacity: u64) -> Result<Self, TreeError> {
        Self::from_leaves(elements, depth_for(capacity))
    }

    /// Tree of a list of composite items: `hash(data_root, length)`.
    ///
    /// # Errors
    /// Returns [`TreeError::TooManyLeaves`] if there are more elements than `limit`.
    pub fn list(elements: Vec<Self>, limit: u64) -> Result<Self, TreeError> {
        let length = elements.len();
        let data = Self::from_leaves(elements, depth_for(limit))?;
        Ok(Self::branch(data, Self::leaf(length_chunk(length))))
    }

    /// Root hash of this tree.
    #[must_use]
    pub fn root(&self) -> Hash256 {
        self.hash
    }

    /// Leaf value and sibling path for `gindex`, read from the leaf upward.
    ///
    /// # Errors
    /// Returns an error for gindex 0 or for a path that runs below an opaque leaf.
    pub fn prove(&self, gindex: GeneralizedIndex) -> Result<TreeProof, TreeError> {
        if gindex == 0 {
            return Err(TreeError::InvalidGeneralizedIndex(gindex));
        }

        let depth = GindexCalculator::gindex_depth(gindex);
        let mut hashes = Vec::with_capacity(depth as usize);
        let mut cursor = Cursor::Node(self);

        for level in (0..depth).rev() {
            let go_right = (gindex >> level) & 1 == 1;
            let (next, sibling) = match cursor.descend() {
                Some((left, right)) if go_right => (right, left),
                Some((left, right)) => (left, right),
                None => {
                    return Err(TreeError::BelowLeaf {
                        gindex,
                        depth: depth - level - 1,
                    })
                }
            };
            hashes.push(sibling.hash());
            cursor = next;
        }

        hashes.reverse();
        Ok(TreeProof {
            leaf: cursor.hash(),
            hashes,
        })
    }
}

/// Replace the opaque leaf of a named field with an expanded subtree.
///
/// The subtree must hash to the same root as the leaf it replaces, so the container root is
/// unchanged and proofs can descend into the field.
///
/// # Errors
/// Returns [`TreeError::UnknownField`] or [`TreeError::SubtreeMismatch`].
pub fn expand_field<C: Container>(
    fields: &mut [MerkleTree],
    field: &'static str,
    subtree: MerkleTree,
) -> Result<(), TreeError> {
    let slot = C::FIELD_NAMES
        .iter()
        .position(|name| *name == field)
        .and_then(|index| fields.get_mut(index))
        .ok_or(TreeError::UnknownField {
            container: C::NAME,
            field,
        })?;
    if slot.hash != subtree.hash {
        return Err(TreeError::SubtreeMismatch {
            container: C::NAME,
            field,
        });
    }
    *slot = subtree;
    Ok(())
}

/// Depth of the subtree needed to hold `width` chunks.
fn depth_for(width: u64) -> u32 {
    power_of_two_ceil(width).trailing_zeros()
}

/// Position while walking down: either a stored node or a virtual zero subtree.
#[derive(Clone, Copy)]
enum Cursor<'a> {
    Node(&'a MerkleTree),
    Zero(u32),
}

impl<'a> Cursor<'a> {
    fn hash(self) -> Hash256 {
        match self {
            Cursor::Node(node) => node.hash,
            Cursor::Zero(depth) => zero_hash(depth),
        }
    }

    fn descend(self) -> Option<(Cursor<'a>, Cursor<'a>)> {
        match self {
            Cursor::Node(MerkleTree {
                kind: Kind::Branch(left, right),
                ..
            }) => Some((Cursor::Node(left), Cursor::Node(right))),
            Cursor::Node(MerkleTree {
                kind: Kind::Zero(depth),
                ..
            }) if *depth > 0 => Some((Cursor::Zero(depth - 1), Cursor::Zero(depth - 1))),
            Cursor::Zero(depth) if depth > 0 => {
                Some((Cursor::Zero(depth - 1), Cursor::Zero(depth - 1)))
            }
            _ => None,
        }
    }
}
