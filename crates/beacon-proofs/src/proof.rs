//! Proof results and errors.
//!
//! Every proof is a flat list of sibling hashes read from the proven leaf up to the trusted
//! root. `ProofVector` is the serialized form handed to verifier test suites.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gindex::{GeneralizedIndex, GindexCalculator};
use crate::layout::ForkName;
use crate::tree::{Hash256, TreeError};
use crate::types::preset::SLOTS_PER_HISTORICAL_ROOT;

/// Sibling hashes from a leaf up to a root.
pub type MerkleProof = Vec<Hash256>;

/// How a [`ProofError`] should be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was malformed for this state or block; pick another method or input.
    Precondition,
    /// `ssz_rs` could not merkleize a value; the context names what was being proven.
    Delegated,
    /// A computed index or layout disagrees with the tree. Always a bug in this crate.
    Internal,
}

/// Errors that can occur during proof generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("validator index {index} out of bounds ({count} validators)")]
    ValidatorIndexOutOfBounds { index: u64, count: usize },

    #[error("withdrawal index {index} out of bounds ({count} withdrawals)")]
    WithdrawalIndexOutOfBounds { index: u64, count: usize },

    #[error(
        "slot {slot} is {window} or more slots behind state slot {state_slot}, \
         use historical_summary_proof instead",
        window = SLOTS_PER_HISTORICAL_ROOT
    )]
    SlotTooOld { slot: u64, state_slot: u64 },

    #[error(
        "slot {slot} is less than {window} slots behind state slot {state_slot}, \
         use block_root_proof instead",
        window = SLOTS_PER_HISTORICAL_ROOT
    )]
    SlotTooRecent { slot: u64, state_slot: u64 },

    #[error("slot {slot} is after state slot {state_slot}")]
    SlotInFuture { slot: u64, state_slot: u64 },

    #[error(
        "state slot {state_slot} is not the last slot of a {window} slot era",
        window = SLOTS_PER_HISTORICAL_ROOT
    )]
    StateNotEraAligned { state_slot: u64 },

    #[error("slot {slot} is outside the era ending at state slot {state_slot}")]
    SlotOutsideEraWindow { slot: i64, state_slot: u64 },

    #[error("no historical summary for era {era} ({count} summaries)")]
    HistoricalSummaryMissing { era: u64, count: usize },

    #[error("could not build {context} proof: {source}")]
    Tree {
        context: &'static str,
        #[source]
        source: TreeError,
    },

    #[error("{context} proof leaf at gindex {gindex} does not match the expected value")]
    LeafMismatch {
        context: &'static str,
        gindex: GeneralizedIndex,
    },
}

impl ProofError {
    /// Wrap a tree engine error with what was being proven.
    pub fn tree(context: &'static str) -> impl FnOnce(TreeError) -> Self {
        move |source| Self::Tree { context, source }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Tree {
                source: TreeError::Merkleization(_),
                ..
            } => ErrorKind::Delegated,
            Self::Tree { .. } | Self::LeafMismatch { .. } => ErrorKind::Internal,
            Self::ValidatorIndexOutOfBounds { .. }
            | Self::WithdrawalIndexOutOfBounds { .. }
            | Self::SlotTooOld { .. }
            | Self::SlotTooRecent { .. }
            | Self::SlotInFuture { .. }
            | Self::StateNotEraAligned { .. }
            | Self::SlotOutsideEraWindow { .. }
            | Self::HistoricalSummaryMissing { .. } => ErrorKind::Precondition,
        }
    }
}

/// Proof families produced by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    ValidatorWithdrawableEpoch,
    ValidatorCredentials,
    Validator,
    Slot,
    BlockRoot,
    HistoricalSummary,
    HistoricalSummaryBlockRoot,
    Withdrawal,
}

/// A self-contained proof test vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofVector {
    pub fork: ForkName,
    pub kind: ProofKind,

    /// Generalized index of the leaf from `root`
    pub gindex: GeneralizedIndex,

    /// Proven leaf value
    #[serde(with = "hex_hash")]
    pub leaf: Hash256,

    /// Root the proof verifies against
    #[serde(with = "hex_hash")]
    pub root: Hash256,

    /// Sibling hashes, leaf upward
    #[serde(with = "hex_hashes")]
    pub proof: MerkleProof,
}

impl ProofVector {
    /// Whether the proof length agrees with the depth of `gindex`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.proof.len() == GindexCalculator::gindex_depth(self.gindex) as usize
    }
}

/// `0x`-prefixed hex for a single hash
mod hex_hash {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::tree::Hash256;

    pub fn serialize<S: Serializer>(hash: &Hash256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash256, D::Error> {
        decode(&String::deserialize(deserializer)?).map_err(de::Error::custom)
    }

    pub(super) fn encode(hash: &Hash256) -> String {
        format!("0x{}", hex::encode(hash))
    }

    /// Accepts the hash with or without its `0x` prefix.
    pub(super) fn decode(s: &str) -> Result<Hash256, String> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|e| e.to_string())?;
        bytes
            .try_into()
            .map_err(|bytes: Vec<u8>| format!("expected 32 bytes, got {}", bytes.len()))
    }
}

/// `0x`-prefixed hex for a sibling list
mod hex_hashes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::hex_hash::{decode, encode};
    use crate::tree::Hash256;

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(hashes: &Vec<Hash256>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(hashes.iter().map(encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Hash256>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| decode(s).map_err(de::Error::custom))
            .collect()
    }
}
