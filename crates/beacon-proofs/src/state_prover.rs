//! State Proof Engine
//!
//! One implementation of every state-side proof, shared by all forks. A fork only has to
//! describe where things live ([`StateView`]); the proofs are composed here:
//!
//! 1. an optional proof inside a validator record,
//! 2. the proof from the state root to the target node,
//! 3. the proof from `latest_block_header`'s root to its `state_root` field.
//!
//! The result verifies against the root of the block header whose `state_root` is this state.

use tracing::{debug, instrument};

use crate::gindex::GeneralizedIndex;
use crate::layout::{
    historical_block_root_gindex, Container, ForkLayout, ForkName, HEADER_STATE_ROOT_GINDEX,
};
use crate::proof::{MerkleProof, ProofError};
use crate::tree::{expand_field, root_of, Hash256, MerkleTree, Merkleized, TreeError};
use crate::types::preset::{
    HISTORICAL_ROOTS_LIMIT, SLOTS_PER_HISTORICAL_ROOT, VALIDATOR_REGISTRY_LIMIT,
};
use crate::types::{
    roots_vector, BeaconBlockHeader, HistoricalSummary, HistoricalSummaryLists, Root, Validator,
};

const SLOTS: u64 = SLOTS_PER_HISTORICAL_ROOT as u64;

/// Read access to the parts of a beacon state that proofs target.
pub trait StateView: Send + Sync {
    fn layout(&self) -> &'static ForkLayout;
    fn slot(&self) -> u64;
    fn validators(&self) -> &[Validator];
    fn latest_block_header(&self) -> &BeaconBlockHeader;
    fn block_roots(&self) -> &[Root];
    fn state_roots(&self) -> &[Root];
    fn historical_summaries(&self) -> &[HistoricalSummary];

    /// Tree of the whole state with the proven fields expanded.
    ///
    /// # Errors
    /// Returns an error if merkleization fails.
    fn state_tree(&self) -> Result<MerkleTree, TreeError>;

    fn fork(&self) -> ForkName {
        self.layout().fork
    }
}

/// Build the state tree for any fork: every field opaque except the four lists and vectors
/// proofs descend into.
///
/// # Errors
/// Returns an error if merkleization fails or the expanded fields disagree with `ssz_rs`.
pub fn build_state_tree<S: StateView + Container>(state: &S) -> Result<MerkleTree, TreeError> {
    let mut fields = state.field_leaves()?;

    expand_field::<S>(&mut fields, "block_roots", roots_vector(state.block_roots())?)?;
    expand_field::<S>(&mut fields, "state_roots", roots_vector(state.state_roots())?)?;

    let validators = state
        .validators()
        .iter()
        .map(MerkleTree::root_leaf)
        .collect::<Result<Vec<_>, _>>()?;
    expand_field::<S>(
        &mut fields,
        "validators",
        MerkleTree::list(validators, VALIDATOR_REGISTRY_LIMIT as u64)?,
    )?;

    let summaries = state
        .historical_summaries()
        .iter()
        .map(MerkleTree::root_leaf)
        .collect::<Result<Vec<_>, _>>()?;
    expand_field::<S>(
        &mut fields,
        "historical_summaries",
        MerkleTree::list(summaries, HISTORICAL_ROOTS_LIMIT as u64)?,
    )?;

    MerkleTree::container::<S>(fields)
}

/// Implement [`StateView`] for a fork's state container.
macro_rules! impl_state_view {
    ($state:ty, $layout:expr) => {
        impl $crate::state_prover::StateView for $state {
            fn layout(&self) -> &'static $crate::layout::ForkLayout {
                &$layout
            }

            fn slot(&self) -> u64 {
                self.slot
            }

            fn validators(&self) -> &[$crate::types::Validator] {
                &self.validators
            }

            fn latest_block_header(&self) -> &$crate::types::BeaconBlockHeader {
                &self.latest_block_header
            }

            fn block_roots(&self) -> &[$crate::types::Root] {
                &self.block_roots
            }

            fn state_roots(&self) -> &[$crate::types::Root] {
                &self.state_roots
            }

            fn historical_summaries(&self) -> &[$crate::types::HistoricalSummary] {
                &self.historical_summaries
            }

            fn state_tree(
                &self,
            ) -> Result<$crate::tree::MerkleTree, $crate::tree::TreeError> {
                $crate::state_prover::build_state_tree(self)
            }
        }
    };
}

pub(crate) use impl_state_view;

/// State-side proofs, available on every [`StateView`].
pub trait BeaconStateProofs: StateView {
    /// Proof of `validators[index].withdrawable_epoch`.
    ///
    /// # Errors
    /// `ValidatorIndexOutOfBounds` for an unknown index, or a tree error.
    fn validator_withdrawable_epoch_proof(&self, index: u64) -> Result<MerkleProof, ProofError>;

    /// Proof of the node joining `validators[index].pubkey` and its withdrawal credentials.
    ///
    /// # Errors
    /// `ValidatorIndexOutOfBounds` for an unknown index, or a tree error.
    fn validator_credentials_proof(&self, index: u64) -> Result<MerkleProof, ProofError>;

    /// Proof of the whole `validators[index]` record.
    ///
    /// # Errors
    /// `ValidatorIndexOutOfBounds` for an unknown index, or a tree error.
    fn validator_proof(&self, index: u64) -> Result<MerkleProof, ProofError>;

    /// Proof of the state's `slot` field.
    ///
    /// # Errors
    /// Returns a tree error if the state cannot be merkleized.
    fn slot_proof(&self) -> Result<MerkleProof, ProofError>;

    /// Proof of the historical summary covering `slot`, for slots at least
    /// `SLOTS_PER_HISTORICAL_ROOT` behind the state.
    ///
    /// # Errors
    /// `SlotTooRecent` inside the live window, `HistoricalSummaryMissing` if the era has no entry.
    fn historical_summary_proof(&self, slot: u64) -> Result<MerkleProof, ProofError>;

    /// Proof of `block_roots[slot % SLOTS_PER_HISTORICAL_ROOT]` against the root of the
    /// historical summary this era-final state produces.
    ///
    /// Not composed with a header proof; chain it with [`Self::historical_summary_proof`]
    /// from a later state.
    ///
    /// # Errors
    /// `StateNotEraAligned` or `SlotOutsideEraWindow`.
    fn historical_summary_block_root_proof(&self, slot: i64) -> Result<MerkleProof, ProofError>;

    /// Proof of the block root for a slot inside the live `block_roots` window.
    ///
    /// # Errors
    /// `SlotTooOld` outside the window, `SlotInFuture` after the state slot.
    fn block_root_proof(&self, slot: u64) -> Result<MerkleProof, ProofError>;
}

impl<T: StateView + ?Sized> BeaconStateProofs for T {
    #[instrument(skip(self), level = "debug", fields(fork = %self.fork()))]
    fn validator_withdrawable_epoch_proof(&self, index: u64) -> Result<MerkleProof, ProofError> {
        let validator = validator_at(self, index)?;
        let inner = validator
            .withdrawable_epoch_proof()
            .map_err(ProofError::tree("validator withdrawable_epoch"))?;

        let proof = compose([
            inner.hashes,
            validator_state_proof(self, index, validator)?,
            header_proof(self)?,
        ]);
        debug!(proof_len = proof.len(), "Built withdrawable epoch proof");
        Ok(proof)
    }

    #[instrument(skip(self), level = "debug", fields(fork = %self.fork()))]
    fn validator_credentials_proof(&self, index: u64) -> Result<MerkleProof, ProofError> {
        let validator = validator_at(self, index)?;
        let inner = validator
            .credentials_pubkey_proof()
            .map_err(ProofError::tree("validator credentials"))?;

        let proof = compose([
            inner.hashes,
            validator_state_proof(self, index, validator)?,
            header_proof(self)?,
        ]);
        debug!(proof_len = proof.len(), "Built credentials proof");
        Ok(proof)
    }

    #[instrument(skip(self), level = "debug", fields(fork = %self.fork()))]
    fn validator_proof(&self, index: u64) -> Result<MerkleProof, ProofError> {
        let validator = validator_at(self, index)?;
        let proof = compose([
            validator_state_proof(self, index, validator)?,
            header_proof(self)?,
        ]);
        debug!(proof_len = proof.len(), "Built validator proof");
        Ok(proof)
    }

    #[instrument(skip(self), level = "debug", fields(fork = %self.fork()))]
    fn slot_proof(&self) -> Result<MerkleProof, ProofError> {
        let tree = self.state_tree().map_err(ProofError::tree("state"))?;
        let slot_leaf = root_of(&self.slot()).map_err(ProofError::tree("slot"))?;
        let proof = compose([
            prove_checked(&tree, self.layout().slot_gindex(), slot_leaf, "slot")?,
            header_proof(self)?,
        ]);
        debug!(proof_len = proof.len(), "Built slot proof");
        Ok(proof)
    }

    #[instrument(skip(self), level = "debug", fields(fork = %self.fork()))]
    fn historical_summary_proof(&self, slot: u64) -> Result<MerkleProof, ProofError> {
        let state_slot = self.slot();
        if slot.saturating_add(SLOTS) > state_slot {
            return Err(ProofError::SlotTooRecent { slot, state_slot });
        }

        let era = slot / SLOTS;
        let summaries = self.historical_summaries();
        let summary = usize::try_from(era)
            .ok()
            .and_then(|era| summaries.get(era))
            .ok_or(ProofError::HistoricalSummaryMissing {
                era,
                count: summaries.len(),
            })?;
        let summary_root = root_of(summary).map_err(ProofError::tree("historical summary"))?;

        let tree = self.state_tree().map_err(ProofError::tree("state"))?;
        let gindex = self.layout().historical_summary_gindex(era);
        let proof = compose([
            prove_checked(&tree, gindex, summary_root, "historical summary")?,
            header_proof(self)?,
        ]);
        debug!(era, gindex, proof_len = proof.len(), "Built historical summary proof");
        Ok(proof)
    }

    #[instrument(skip(self), level = "debug", fields(fork = %self.fork()))]
    fn historical_summary_block_root_proof(&self, slot: i64) -> Result<MerkleProof, ProofError> {
        let state_slot = self.slot();
        if state_slot % SLOTS != SLOTS - 1 {
            return Err(ProofError::StateNotEraAligned { state_slot });
        }

        // The era-final state's block_roots hold the roots of [state_slot - SLOTS, state_slot - 1]
        let outside = ProofError::SlotOutsideEraWindow { slot, state_slot };
        let era_slot = u64::try_from(slot)
            .ok()
            .filter(|s| *s < state_slot && s.saturating_add(SLOTS) >= state_slot)
            .ok_or_else(|| outside.clone())?;

        let expected = self
            .block_roots()
            .get((era_slot % SLOTS) as usize)
            .copied()
            .ok_or(outside)?;

        let lists = HistoricalSummaryLists::new(self.block_roots(), self.state_roots());
        let tree = lists
            .tree()
            .map_err(ProofError::tree("historical summary lists"))?;
        let gindex = historical_block_root_gindex(era_slot);
        let proof = prove_checked(&tree, gindex, expected, "historical block root")?;
        debug!(gindex, proof_len = proof.len(), "Built historical block root proof");
        Ok(proof)
    }

    #[instrument(skip(self), level = "debug", fields(fork = %self.fork()))]
    fn block_root_proof(&self, slot: u64) -> Result<MerkleProof, ProofError> {
        let state_slot = self.slot();
        if slot > state_slot {
            return Err(ProofError::SlotInFuture { slot, state_slot });
        }
        if slot.saturating_add(SLOTS) <= state_slot {
            return Err(ProofError::SlotTooOld { slot, state_slot });
        }

        let position = (slot % SLOTS) as usize;
        let expected = self
            .block_roots()
            .get(position)
            .copied()
            .ok_or(ProofError::SlotTooOld { slot, state_slot })?;

        let tree = self.state_tree().map_err(ProofError::tree("state"))?;
        let gindex = self.layout().block_root_gindex(slot);
        let proof = compose([
            prove_checked(&tree, gindex, expected, "block root")?,
            header_proof(self)?,
        ]);
        debug!(gindex, proof_len = proof.len(), "Built block root proof");
        Ok(proof)
    }
}

/// Bounds-checked validator lookup, done before any tree is built.
fn validator_at<S: StateView + ?Sized>(state: &S, index: u64) -> Result<&Validator, ProofError> {
    let validators = state.validators();
    usize::try_from(index)
        .ok()
        .and_then(|i| validators.get(i))
        .ok_or(ProofError::ValidatorIndexOutOfBounds {
            index,
            count: validators.len(),
        })
}

/// Proof from the state root to `validators[index]`, checked against the validator's root.
fn validator_state_proof<S: StateView + ?Sized>(
    state: &S,
    index: u64,
    validator: &Validator,
) -> Result<MerkleProof, ProofError> {
    let tree = state.state_tree().map_err(ProofError::tree("state"))?;
    let validator_root = root_of(validator).map_err(ProofError::tree("validator"))?;
    let gindex = state.layout().validator_gindex(index);
    prove_checked(&tree, gindex, validator_root, "validator")
}

/// Proof from `latest_block_header`'s root to its `state_root` field.
///
/// Siblings never include `state_root` itself, so the proof holds for the header with the
/// state root filled in.
fn header_proof<S: StateView + ?Sized>(state: &S) -> Result<MerkleProof, ProofError> {
    let tree = state
        .latest_block_header()
        .tree()
        .map_err(ProofError::tree("block header"))?;
    let proof = tree
        .prove(HEADER_STATE_ROOT_GINDEX)
        .map_err(ProofError::tree("block header state_root"))?;
    Ok(proof.hashes)
}

/// Prove `gindex` and check the engine returned the leaf the caller expects.
pub(crate) fn prove_checked(
    tree: &MerkleTree,
    gindex: GeneralizedIndex,
    expected: Hash256,
    context: &'static str,
) -> Result<MerkleProof, ProofError> {
    let proof = tree.prove(gindex).map_err(ProofError::tree(context))?;
    if proof.leaf != expected {
        return Err(ProofError::LeafMismatch { context, gindex });
    }
    Ok(proof.hashes)
}

/// Concatenate proofs, innermost first.
fn compose<const N: usize>(parts: [MerkleProof; N]) -> MerkleProof {
    parts.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::AnyBeaconState;
    use crate::fixtures::{self, verify_branch};
    use crate::gindex::GindexCalculator;
    use crate::layout::{VALIDATOR_CREDENTIALS_PUBKEY_GINDEX, VALIDATOR_WITHDRAWABLE_EPOCH_GINDEX};
    use crate::proof::ErrorKind;

    /// Header root with `state_root` filled in: the root the composed proofs verify against.
    fn block_root(state: &AnyBeaconState) -> Hash256 {
        root_of(&fixtures::header_for(state).unwrap()).unwrap()
    }

    fn states() -> Vec<AnyBeaconState> {
        ForkName::ALL
            .into_iter()
            .map(|fork| fixtures::state(fork, 5, 1000))
            .collect()
    }

    #[test]
    fn test_state_tree_root_matches_ssz_rs() {
        for state in states() {
            let tree = state.state_tree().unwrap();
            assert_eq!(tree.root(), state.state_root().unwrap(), "{}", state.fork());
        }
    }

    #[test]
    fn test_credentials_proof_verifies_against_block_root() {
        for state in states() {
            let proof = state.validator_credentials_proof(2).unwrap();
            let validator = &state.validators()[2];
            let leaf = validator.credentials_pubkey_proof().unwrap().leaf;

            let gindex = GindexCalculator::concat_gindices(&[
                HEADER_STATE_ROOT_GINDEX,
                state.layout().validator_gindex(2),
                VALIDATOR_CREDENTIALS_PUBKEY_GINDEX,
            ]);
            assert_eq!(proof.len(), GindexCalculator::gindex_depth(gindex) as usize);
            assert!(
                verify_branch(leaf, &proof, gindex, block_root(&state)),
                "{}",
                state.fork()
            );
        }
    }

    #[test]
    fn test_withdrawable_epoch_proof_verifies_against_block_root() {
        for state in states() {
            let proof = state.validator_withdrawable_epoch_proof(4).unwrap();
            let leaf = root_of(&state.validators()[4].withdrawable_epoch).unwrap();

            let gindex = GindexCalculator::concat_gindices(&[
                HEADER_STATE_ROOT_GINDEX,
                state.layout().validator_gindex(4),
                VALIDATOR_WITHDRAWABLE_EPOCH_GINDEX,
            ]);
            assert!(verify_branch(leaf, &proof, gindex, block_root(&state)));
        }
    }

    #[test]
    fn test_validator_proof_verifies_against_block_root() {
        for state in states() {
            let proof = state.validator_proof(0).unwrap();
            let leaf = root_of(&state.validators()[0]).unwrap();
            let gindex = GindexCalculator::concat_gindices(&[
                HEADER_STATE_ROOT_GINDEX,
                state.layout().validator_gindex(0),
            ]);
            assert!(verify_branch(leaf, &proof, gindex, block_root(&state)));
        }
    }

    #[test]
    fn test_slot_proof_verifies_against_block_root() {
        for state in states() {
            let proof = state.slot_proof().unwrap();
            let leaf = root_of(&state.slot()).unwrap();
            let gindex = GindexCalculator::concat_gindices(&[
                HEADER_STATE_ROOT_GINDEX,
                state.layout().slot_gindex(),
            ]);
            assert!(verify_branch(leaf, &proof, gindex, block_root(&state)));
        }
    }

    #[test]
    fn test_validator_index_out_of_bounds() {
        for state in states() {
            for result in [
                state.validator_credentials_proof(5),
                state.validator_withdrawable_epoch_proof(5),
                state.validator_proof(u64::MAX),
            ] {
                let err = result.unwrap_err();
                assert!(matches!(
                    err,
                    ProofError::ValidatorIndexOutOfBounds { count: 5, .. }
                ));
                assert_eq!(err.kind(), ErrorKind::Precondition);
            }
        }
    }

    #[test]
    fn test_block_root_proof_verifies() {
        let state_slot = 20_000;
        for fork in ForkName::ALL {
            let state = fixtures::state(fork, 2, state_slot);
            for slot in [state_slot, state_slot - 1, state_slot - SLOTS + 1] {
                let proof = state.block_root_proof(slot).unwrap();
                let leaf = state.block_roots()[(slot % SLOTS) as usize];
                let gindex = GindexCalculator::concat_gindices(&[
                    HEADER_STATE_ROOT_GINDEX,
                    state.layout().block_root_gindex(slot),
                ]);
                assert!(verify_branch(leaf, &proof, gindex, block_root(&state)));
            }
        }
    }

    #[test]
    fn test_block_root_proof_rejects_old_and_future_slots() {
        let state = fixtures::state(ForkName::Deneb, 1, 20_000);
        assert_eq!(
            state.block_root_proof(20_000 - SLOTS),
            Err(ProofError::SlotTooOld {
                slot: 20_000 - SLOTS,
                state_slot: 20_000
            })
        );
        assert_eq!(
            state.block_root_proof(20_001),
            Err(ProofError::SlotInFuture {
                slot: 20_001,
                state_slot: 20_000
            })
        );
    }

    #[test]
    fn test_historical_summary_proof_verifies() {
        let state_slot = 5 * SLOTS + 100;
        for fork in ForkName::ALL {
            let state = fixtures::state_with_summaries(fork, 2, state_slot, 5);
            let slot = 2 * SLOTS + 17;
            let proof = state.historical_summary_proof(slot).unwrap();
            let leaf = root_of(&state.historical_summaries()[2]).unwrap();
            let gindex = GindexCalculator::concat_gindices(&[
                HEADER_STATE_ROOT_GINDEX,
                state.layout().historical_summary_gindex(2),
            ]);
            assert!(verify_branch(leaf, &proof, gindex, block_root(&state)));
        }
    }

    #[test]
    fn test_historical_summary_proof_rejects_recent_and_missing() {
        let state = fixtures::state_with_summaries(ForkName::Electra, 1, 3 * SLOTS, 1);
        assert_eq!(
            state.historical_summary_proof(2 * SLOTS + 1),
            Err(ProofError::SlotTooRecent {
                slot: 2 * SLOTS + 1,
                state_slot: 3 * SLOTS
            })
        );
        assert_eq!(
            state.historical_summary_proof(SLOTS),
            Err(ProofError::HistoricalSummaryMissing { era: 1, count: 1 })
        );
    }

    #[test]
    fn test_block_root_and_historical_paths_partition_slots() {
        let state_slot = 3 * SLOTS + 5;
        let state = fixtures::state_with_summaries(ForkName::Deneb, 1, state_slot, 3);
        for slot in (0..=state_slot)
            .step_by(1500)
            .chain([state_slot - SLOTS, state_slot - SLOTS + 1, state_slot])
        {
            let recent = slot + SLOTS > state_slot;
            let block_root = state.block_root_proof(slot);
            let historical = state.historical_summary_proof(slot);
            assert_eq!(block_root.is_ok(), recent, "slot {slot}");
            assert_eq!(historical.is_ok(), !recent, "slot {slot}");
        }
    }

    #[test]
    fn test_historical_block_root_proof_verifies() {
        let state_slot = 4 * SLOTS - 1;
        for fork in ForkName::ALL {
            let state = fixtures::state(fork, 1, state_slot);
            let summary = HistoricalSummaryLists::new(state.block_roots(), state.state_roots())
                .summary()
                .unwrap();
            let summary_root = root_of(&summary).unwrap();

            for slot in [state_slot - SLOTS, state_slot - 1, state_slot - 4000] {
                let proof = state.historical_summary_block_root_proof(slot as i64).unwrap();
                let leaf = state.block_roots()[(slot % SLOTS) as usize];
                assert!(verify_branch(
                    leaf,
                    &proof,
                    historical_block_root_gindex(slot),
                    summary_root
                ));
            }
        }
    }

    #[test]
    fn test_historical_block_root_proof_rejects_misaligned_state_and_window() {
        let misaligned = fixtures::state(ForkName::Fulu, 1, 4 * SLOTS - 2);
        assert_eq!(
            misaligned.historical_summary_block_root_proof(3 * SLOTS),
            Err(ProofError::StateNotEraAligned {
                state_slot: 4 * SLOTS - 2
            })
        );

        let state_slot = 4 * SLOTS - 1;
        let state = fixtures::state(ForkName::Fulu, 1, state_slot);
        for slot in [
            -1,
            (state_slot - SLOTS - 1) as i64,
            state_slot as i64,
            (state_slot + 1) as i64,
        ] {
            assert_eq!(
                state.historical_summary_block_root_proof(slot),
                Err(ProofError::SlotOutsideEraWindow { slot, state_slot })
            );
        }
    }

    #[test]
    fn test_prove_checked_rejects_wrong_leaf() {
        for state in states() {
            let tree = state.state_tree().unwrap();
            let layout = state.layout();
            let expected = root_of(&state.validators()[2]).unwrap();

            let err = prove_checked(&tree, layout.validator_gindex(3), expected, "validator")
                .unwrap_err();
            assert_eq!(
                err,
                ProofError::LeafMismatch {
                    context: "validator",
                    gindex: layout.validator_gindex(3),
                }
            );
            assert_eq!(err.kind(), ErrorKind::Internal);

            let matching = prove_checked(&tree, layout.validator_gindex(2), expected, "validator");
            assert!(matching.is_ok());
        }
    }

    #[test]
    fn test_gindex_below_a_validator_leaf_is_internal() {
        let state = fixtures::state(ForkName::Electra, 5, 1000);
        let tree = state.state_tree().unwrap();
        let gindex = state.layout().validator_gindex(2) * 2;

        let err = prove_checked(&tree, gindex, [0u8; 32], "validator").unwrap_err();
        assert!(matches!(
            err,
            ProofError::Tree {
                source: TreeError::BelowLeaf { .. },
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
