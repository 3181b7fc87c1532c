//! Synthetic containers for tests and vector generation.
//!
//! Every root stored in a fixture is distinct, so a proof landing on the wrong leaf is caught by
//! the leaf checks instead of passing by coincidence.

use sha2::{Digest, Sha256};
use ssz_rs::prelude::Node;

use crate::deneb::{BeaconBlockDeneb, BeaconStateDeneb};
use crate::dispatch::{AnyBeaconBlock, AnyBeaconState};
use crate::electra::{BeaconBlockElectra, BeaconStateElectra};
use crate::fulu::{BeaconBlockFulu, BeaconStateFulu};
use crate::gindex::GeneralizedIndex;
use crate::layout::ForkName;
use crate::tree::{Hash256, TreeError};
use crate::types::preset::SLOTS_PER_HISTORICAL_ROOT;
use crate::types::{BeaconBlockHeader, HistoricalSummary, Root, Validator, Withdrawal};

/// Deterministic 32-byte value for `(tag, index)`.
#[must_use]
pub fn root(tag: &str, index: u64) -> Root {
    let mut hasher = Sha256::new();
    hasher.update(tag.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.finalize().into()
}

/// Active validator `index` with 0x01 credentials.
#[must_use]
pub fn validator(index: u64) -> Validator {
    let mut validator = Validator::default();
    validator.pubkey[..32].copy_from_slice(&root("pubkey", index));
    validator.withdrawal_credentials[0] = 0x01;
    validator.withdrawal_credentials[12..].copy_from_slice(&root("address", index)[..20]);
    validator.effective_balance = 32_000_000_000;
    validator.activation_eligibility_epoch = index;
    validator.activation_epoch = index + 1;
    validator.exit_epoch = u64::MAX;
    validator.withdrawable_epoch = 1_000 + index;
    validator
}

/// Historical summary entry for `era`.
#[must_use]
pub fn historical_summary(era: u64) -> HistoricalSummary {
    HistoricalSummary {
        block_summary_root: root("block_summary", era),
        state_summary_root: root("state_summary", era),
    }
}

/// Fill the fields every fork's state shares.
macro_rules! populate_state {
    ($state:expr, $validators:expr, $slot:expr) => {{
        let state = &mut $state;
        state.genesis_time = 1_606_824_023;
        state.genesis_validators_root = root("genesis", 0);
        state.slot = $slot;
        state.latest_block_header = BeaconBlockHeader {
            slot: $slot,
            proposer_index: $slot % 64,
            parent_root: root("parent", $slot),
            state_root: [0u8; 32],
            body_root: root("body", $slot),
        };
        for i in 0..SLOTS_PER_HISTORICAL_ROOT {
            state.block_roots[i] = root("block_root", i as u64);
            state.state_roots[i] = root("state_root", i as u64);
        }
        for i in 0..$validators {
            state.validators.push(validator(i));
            state.balances.push(32_000_000_000 + i);
        }
        state.finalized_checkpoint.epoch = $slot / 32;
        state.finalized_checkpoint.root = root("finalized", $slot);
        state.latest_execution_payload_header.block_hash = root("payload", $slot);
    }};
}

/// State of `fork` at `slot` with `validators` validators and no historical summaries.
#[must_use]
pub fn state(fork: ForkName, validators: u64, slot: u64) -> AnyBeaconState {
    match fork {
        ForkName::Deneb => {
            let mut state = BeaconStateDeneb::default();
            populate_state!(state, validators, slot);
            state.into()
        }
        ForkName::Electra => {
            let mut state = BeaconStateElectra::default();
            populate_state!(state, validators, slot);
            state.pending_consolidations.push(crate::types::PendingConsolidation {
                source_index: 0,
                target_index: validators.saturating_sub(1),
            });
            state.into()
        }
        ForkName::Fulu => {
            let mut state = BeaconStateFulu::default();
            populate_state!(state, validators, slot);
            for (i, proposer) in state.proposer_lookahead.iter_mut().enumerate() {
                *proposer = i as u64 % validators.max(1);
            }
            state.into()
        }
    }
}

/// Like [`state`], with `summaries` historical summaries for eras `0..summaries`.
#[must_use]
pub fn state_with_summaries(
    fork: ForkName,
    validators: u64,
    slot: u64,
    summaries: u64,
) -> AnyBeaconState {
    let mut state = state(fork, validators, slot);
    let summaries: Vec<_> = (0..summaries).map(historical_summary).collect();
    set_historical_summaries(&mut state, &summaries);
    state
}

/// Replace a state's historical summaries.
pub fn set_historical_summaries(state: &mut AnyBeaconState, summaries: &[HistoricalSummary]) {
    macro_rules! replace {
        ($inner:expr) => {{
            $inner.historical_summaries = Default::default();
            for summary in summaries {
                $inner.historical_summaries.push(summary.clone());
            }
        }};
    }
    match state {
        AnyBeaconState::Deneb(inner) => replace!(inner),
        AnyBeaconState::Electra(inner) => replace!(inner),
        AnyBeaconState::Fulu(inner) => replace!(inner),
    }
}

/// Fill the fields every fork's block shares.
macro_rules! populate_block {
    ($block:expr, $withdrawals:expr) => {{
        let block = &mut $block;
        block.slot = 9_000_000;
        block.proposer_index = 42;
        block.parent_root = root("parent", block.slot);
        block.state_root = root("state", block.slot);
        block.body.graffiti = root("graffiti", 0);
        block.body.eth1_data.deposit_count = 12;

        let payload = &mut block.body.execution_payload;
        payload.block_hash = root("payload", 9_000_000);
        payload.block_number = 21_000_000;
        payload.gas_limit = 36_000_000;
        for i in 0..$withdrawals as u64 {
            let mut address = [0u8; 20];
            address.copy_from_slice(&root("address", i)[..20]);
            payload.withdrawals.push(Withdrawal {
                index: 50_000 + i,
                validator_index: 100 + 3 * i,
                address,
                amount: 17_000_000 + i,
            });
        }
    }};
}

/// Block of `fork` carrying a payload with `withdrawals` withdrawals.
#[must_use]
pub fn block(fork: ForkName, withdrawals: usize) -> AnyBeaconBlock {
    match fork {
        ForkName::Deneb => {
            let mut block = BeaconBlockDeneb::default();
            populate_block!(block, withdrawals);
            block.into()
        }
        ForkName::Electra => {
            let mut block = BeaconBlockElectra::default();
            populate_block!(block, withdrawals);
            block.into()
        }
        ForkName::Fulu => {
            let mut block = BeaconBlockFulu::default();
            populate_block!(block, withdrawals);
            block.into()
        }
    }
}

/// `latest_block_header` with `state_root` filled in: the header of the block that produced
/// this state, whose root state proofs verify against.
///
/// # Errors
/// Returns an error if the state cannot be merkleized.
pub fn header_for(state: &AnyBeaconState) -> Result<BeaconBlockHeader, TreeError> {
    use crate::state_prover::StateView;

    let mut header = state.latest_block_header().clone();
    header.state_root = state.state_root()?;
    Ok(header)
}

/// Check a proof with `ssz_rs`'s branch verifier.
#[must_use]
pub fn verify_branch(
    leaf: Hash256,
    proof: &[Hash256],
    gindex: GeneralizedIndex,
    root: Hash256,
) -> bool {
    let (Ok(leaf), Ok(root), Ok(gindex)) = (
        Node::try_from(leaf.as_slice()),
        Node::try_from(root.as_slice()),
        usize::try_from(gindex),
    ) else {
        return false;
    };
    let Ok(branch) = proof
        .iter()
        .map(|hash| Node::try_from(hash.as_slice()))
        .collect::<Result<Vec<_>, _>>()
    else {
        return false;
    };
    ssz_rs::proofs::is_valid_merkle_branch_for_generalized_index(leaf, &branch, gindex, root)
        .is_ok()
}
