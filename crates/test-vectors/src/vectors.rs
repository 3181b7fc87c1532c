//! Proof vector construction over synthetic states and blocks.

use anyhow::{ensure, Context, Result};
use beacon_proofs::fixtures;
use beacon_proofs::gindex::GindexCalculator;
use beacon_proofs::layout::{
    historical_block_root_gindex, HEADER_STATE_ROOT_GINDEX, VALIDATOR_CREDENTIALS_PUBKEY_GINDEX,
    VALIDATOR_WITHDRAWABLE_EPOCH_GINDEX,
};
use beacon_proofs::tree::root_of;
use beacon_proofs::types::preset::SLOTS_PER_HISTORICAL_ROOT;
use beacon_proofs::{
    BeaconBlockProofs, BeaconStateProofs, BlockView, ForkName, HistoricalSummaryLists, ProofKind,
    ProofVector, StateView,
};

const SLOTS: u64 = SLOTS_PER_HISTORICAL_ROOT as u64;

/// Sizes of the synthetic containers vectors are drawn from.
#[derive(Debug, Clone, Copy)]
pub struct VectorConfig {
    pub validators: u64,
    pub withdrawals: usize,
    pub summaries: u64,
}

/// Build one vector of every proof kind for `fork`.
///
/// # Errors
/// Fails if a proof cannot be built or comes out malformed.
pub fn generate(fork: ForkName, config: VectorConfig) -> Result<Vec<ProofVector>> {
    ensure!(config.validators > 0, "at least one validator is required");
    ensure!(config.withdrawals > 0, "at least one withdrawal is required");
    ensure!(config.summaries > 2, "at least three historical summaries are required");

    let state_slot = (config.summaries + 1) * SLOTS + 100;
    let state =
        fixtures::state_with_summaries(fork, config.validators, state_slot, config.summaries);
    let header_root = root_of(&fixtures::header_for(&state)?)?;
    let layout = state.layout();

    let index = config.validators / 2;
    let validator = state
        .validators()
        .get(index as usize)
        .context("validator fixture is missing")?;
    let in_header = |gindex| GindexCalculator::concat_gindices(&[HEADER_STATE_ROOT_GINDEX, gindex]);

    let mut vectors = vec![
        ProofVector {
            fork,
            kind: ProofKind::ValidatorWithdrawableEpoch,
            gindex: GindexCalculator::concat_gindices(&[
                HEADER_STATE_ROOT_GINDEX,
                layout.validator_gindex(index),
                VALIDATOR_WITHDRAWABLE_EPOCH_GINDEX,
            ]),
            leaf: root_of(&validator.withdrawable_epoch)?,
            root: header_root,
            proof: state.validator_withdrawable_epoch_proof(index)?,
        },
        ProofVector {
            fork,
            kind: ProofKind::ValidatorCredentials,
            gindex: GindexCalculator::concat_gindices(&[
                HEADER_STATE_ROOT_GINDEX,
                layout.validator_gindex(index),
                VALIDATOR_CREDENTIALS_PUBKEY_GINDEX,
            ]),
            leaf: validator.credentials_pubkey_proof()?.leaf,
            root: header_root,
            proof: state.validator_credentials_proof(index)?,
        },
        ProofVector {
            fork,
            kind: ProofKind::Validator,
            gindex: in_header(layout.validator_gindex(index)),
            leaf: root_of(validator)?,
            root: header_root,
            proof: state.validator_proof(index)?,
        },
        ProofVector {
            fork,
            kind: ProofKind::Slot,
            gindex: in_header(layout.slot_gindex()),
            leaf: root_of(&state_slot)?,
            root: header_root,
            proof: state.slot_proof()?,
        },
    ];

    let recent = state_slot - 1;
    vectors.push(ProofVector {
        fork,
        kind: ProofKind::BlockRoot,
        gindex: in_header(layout.block_root_gindex(recent)),
        leaf: state.block_roots()[(recent % SLOTS) as usize],
        root: header_root,
        proof: state.block_root_proof(recent)?,
    });

    let old = 2 * SLOTS + 17;
    let era = old / SLOTS;
    let summary = state
        .historical_summaries()
        .get(era as usize)
        .context("historical summary fixture is missing")?;
    vectors.push(ProofVector {
        fork,
        kind: ProofKind::HistoricalSummary,
        gindex: in_header(layout.historical_summary_gindex(era)),
        leaf: root_of(summary)?,
        root: header_root,
        proof: state.historical_summary_proof(old)?,
    });

    let era_state = fixtures::state(fork, config.validators, 4 * SLOTS - 1);
    let era_slot = era_state.slot() - 100;
    let lists = HistoricalSummaryLists::new(era_state.block_roots(), era_state.state_roots());
    vectors.push(ProofVector {
        fork,
        kind: ProofKind::HistoricalSummaryBlockRoot,
        gindex: historical_block_root_gindex(era_slot),
        leaf: era_state.block_roots()[(era_slot % SLOTS) as usize],
        root: root_of(&lists.summary()?)?,
        proof: era_state.historical_summary_block_root_proof(i64::try_from(era_slot)?)?,
    });

    let block = fixtures::block(fork, config.withdrawals);
    let position = (config.withdrawals - 1) as u64;
    let block_root = block.block_root()?;
    // Verifiers usually hold the header, not the block
    ensure!(
        root_of(&block.header()?)? == block_root,
        "{fork} block header root differs from the block root"
    );
    vectors.push(ProofVector {
        fork,
        kind: ProofKind::Withdrawal,
        gindex: block.layout().withdrawal_gindex(position),
        leaf: root_of(&block.withdrawals()[position as usize])?,
        root: block_root,
        proof: block.prove_withdrawal(position)?,
    });

    for vector in &vectors {
        ensure!(
            vector.is_well_formed(),
            "{fork} {:?} proof has {} hashes for gindex {}",
            vector.kind,
            vector.proof.len(),
            vector.gindex
        );
    }
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: VectorConfig = VectorConfig {
        validators: 4,
        withdrawals: 2,
        summaries: 3,
    };

    #[test]
    fn test_every_kind_is_generated_and_verifies() {
        for fork in ForkName::ALL {
            let vectors = generate(fork, CONFIG).unwrap();
            assert_eq!(vectors.len(), 8);
            for vector in &vectors {
                assert_eq!(vector.fork, fork);
                assert!(
                    fixtures::verify_branch(vector.leaf, &vector.proof, vector.gindex, vector.root),
                    "{fork} {:?}",
                    vector.kind
                );
            }
        }
    }

    #[test]
    fn test_rejects_empty_config() {
        let config = VectorConfig {
            validators: 0,
            ..CONFIG
        };
        assert!(generate(ForkName::Deneb, config).is_err());
    }
}
