//! Block Proof Engine
//!
//! Withdrawal proofs descend `block -> body -> execution_payload -> withdrawals[i]` and stand
//! alone against the block root; no header composition is needed.

use tracing::{debug, instrument};

use crate::layout::{Container, ForkLayout, ForkName};
use crate::proof::{MerkleProof, ProofError};
use crate::state_prover::prove_checked;
use crate::tree::{expand_field, root_of, MerkleTree, Merkleized, TreeError};
use crate::types::preset::MAX_WITHDRAWALS_PER_PAYLOAD;
use crate::types::{ExecutionPayload, Withdrawal};

/// Read access to the parts of a beacon block that proofs target.
pub trait BlockView: Send + Sync {
    fn layout(&self) -> &'static ForkLayout;
    fn slot(&self) -> u64;
    fn execution_payload(&self) -> &ExecutionPayload;

    /// Tree of the whole block with the path to the withdrawals expanded.
    ///
    /// # Errors
    /// Returns an error if merkleization fails.
    fn block_tree(&self) -> Result<MerkleTree, TreeError>;

    fn fork(&self) -> ForkName {
        self.layout().fork
    }

    /// Whether the block carries a real payload (non-zero `block_hash`).
    fn has_execution_payload(&self) -> bool {
        self.execution_payload().block_hash != [0u8; 32]
    }

    fn withdrawals(&self) -> &[Withdrawal] {
        &self.execution_payload().withdrawals
    }
}

impl Merkleized for ExecutionPayload {
    fn tree(&self) -> Result<MerkleTree, TreeError> {
        let withdrawals = self
            .withdrawals
            .iter()
            .map(MerkleTree::root_leaf)
            .collect::<Result<Vec<_>, _>>()?;

        let mut fields = self.field_leaves()?;
        expand_field::<Self>(
            &mut fields,
            "withdrawals",
            MerkleTree::list(withdrawals, MAX_WITHDRAWALS_PER_PAYLOAD as u64)?,
        )?;
        MerkleTree::container::<Self>(fields)
    }
}

/// Build a block tree for any fork with `body.execution_payload.withdrawals` expanded.
///
/// # Errors
/// Returns an error if merkleization fails or an expanded field disagrees with `ssz_rs`.
pub fn build_block_tree<B: Container, Body: Container>(
    block: &B,
    body: &Body,
    payload: &ExecutionPayload,
) -> Result<MerkleTree, TreeError> {
    let mut body_fields = body.field_leaves()?;
    expand_field::<Body>(&mut body_fields, "execution_payload", payload.tree()?)?;

    let mut block_fields = block.field_leaves()?;
    expand_field::<B>(
        &mut block_fields,
        "body",
        MerkleTree::container::<Body>(body_fields)?,
    )?;
    MerkleTree::container::<B>(block_fields)
}

/// Implement [`BlockView`] for a fork's block container.
macro_rules! impl_block_view {
    ($block:ty, $layout:expr) => {
        impl $crate::block_prover::BlockView for $block {
            fn layout(&self) -> &'static $crate::layout::ForkLayout {
                &$layout
            }

            fn slot(&self) -> u64 {
                self.slot
            }

            fn execution_payload(&self) -> &$crate::types::ExecutionPayload {
                &self.body.execution_payload
            }

            fn block_tree(
                &self,
            ) -> Result<$crate::tree::MerkleTree, $crate::tree::TreeError> {
                $crate::block_prover::build_block_tree(
                    self,
                    &self.body,
                    &self.body.execution_payload,
                )
            }
        }
    };
}

pub(crate) use impl_block_view;

/// Block-side proofs, available on every [`BlockView`].
pub trait BeaconBlockProofs: BlockView {
    /// Proof of `body.execution_payload.withdrawals[index]` against the block root.
    ///
    /// # Errors
    /// `WithdrawalIndexOutOfBounds` past the populated withdrawals, or a tree error.
    fn prove_withdrawal(&self, index: u64) -> Result<MerkleProof, ProofError>;

    /// Position of the first withdrawal paying `validator_index`.
    fn find_withdrawal(&self, validator_index: u64) -> Option<u64>;
}

impl<T: BlockView + ?Sized> BeaconBlockProofs for T {
    #[instrument(skip(self), level = "debug", fields(fork = %self.fork(), slot = self.slot()))]
    fn prove_withdrawal(&self, index: u64) -> Result<MerkleProof, ProofError> {
        let withdrawals = self.withdrawals();
        let withdrawal = usize::try_from(index)
            .ok()
            .and_then(|i| withdrawals.get(i))
            .ok_or(ProofError::WithdrawalIndexOutOfBounds {
                index,
                count: withdrawals.len(),
            })?;
        let withdrawal_root = root_of(withdrawal).map_err(ProofError::tree("withdrawal"))?;

        let tree = self.block_tree().map_err(ProofError::tree("block"))?;
        let gindex = self.layout().withdrawal_gindex(index);
        let proof = prove_checked(&tree, gindex, withdrawal_root, "withdrawal")?;
        debug!(gindex, proof_len = proof.len(), "Built withdrawal proof");
        Ok(proof)
    }

    fn find_withdrawal(&self, validator_index: u64) -> Option<u64> {
        self.withdrawals()
            .iter()
            .position(|w| w.validator_index == validator_index)
            .map(|position| position as u64)
    }
}
