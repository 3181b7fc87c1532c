//! Fulu BeaconState and BeaconBlock
//!
//! Fulu adds `proposer_lookahead` as state field 37 and reuses the Electra block body.

use ssz_rs::prelude::*;

use crate::block_prover::impl_block_view;
use crate::electra::BeaconBlockBodyElectra;
use crate::layout::{ssz_container, FULU};
use crate::state_prover::impl_state_view;
use crate::types::preset::{
    EPOCHS_PER_HISTORICAL_VECTOR, EPOCHS_PER_SLASHINGS_VECTOR, HISTORICAL_ROOTS_LIMIT,
    PENDING_CONSOLIDATIONS_LIMIT, PENDING_DEPOSITS_LIMIT, PENDING_PARTIAL_WITHDRAWALS_LIMIT,
    PROPOSER_LOOKAHEAD_LENGTH, VALIDATOR_REGISTRY_LIMIT,
};
use crate::types::{
    BeaconBlockHeader, Checkpoint, Eth1Data, Eth1DataVotes, ExecutionPayloadHeader, Fork,
    HistoricalSummary, PendingConsolidation, PendingDeposit, PendingPartialWithdrawal, Root,
    SlotRoots, SyncCommittee, Validator,
};

ssz_container! {
    /// Fulu beacon state
    pub struct BeaconStateFulu {
        pub genesis_time: u64,
        pub genesis_validators_root: Root,
        pub slot: u64,
        pub fork: Fork,
        pub latest_block_header: BeaconBlockHeader,
        pub block_roots: SlotRoots,
        pub state_roots: SlotRoots,
        pub historical_roots: List<Root, HISTORICAL_ROOTS_LIMIT>,
        pub eth1_data: Eth1Data,
        pub eth1_data_votes: Eth1DataVotes,
        pub eth1_deposit_index: u64,
        pub validators: List<Validator, VALIDATOR_REGISTRY_LIMIT>,
        pub balances: List<u64, VALIDATOR_REGISTRY_LIMIT>,
        pub randao_mixes: Vector<Root, EPOCHS_PER_HISTORICAL_VECTOR>,
        pub slashings: Vector<u64, EPOCHS_PER_SLASHINGS_VECTOR>,
        pub previous_epoch_participation: List<u8, VALIDATOR_REGISTRY_LIMIT>,
        pub current_epoch_participation: List<u8, VALIDATOR_REGISTRY_LIMIT>,
        pub justification_bits: Bitvector<4>,
        pub previous_justified_checkpoint: Checkpoint,
        pub current_justified_checkpoint: Checkpoint,
        pub finalized_checkpoint: Checkpoint,
        pub inactivity_scores: List<u64, VALIDATOR_REGISTRY_LIMIT>,
        pub current_sync_committee: SyncCommittee,
        pub next_sync_committee: SyncCommittee,
        pub latest_execution_payload_header: ExecutionPayloadHeader,
        pub next_withdrawal_index: u64,
        pub next_withdrawal_validator_index: u64,
        pub historical_summaries: List<HistoricalSummary, HISTORICAL_ROOTS_LIMIT>,
        pub deposit_requests_start_index: u64,
        pub deposit_balance_to_consume: u64,
        pub exit_balance_to_consume: u64,
        pub earliest_exit_epoch: u64,
        pub consolidation_balance_to_consume: u64,
        pub earliest_consolidation_epoch: u64,
        pub pending_deposits: List<PendingDeposit, PENDING_DEPOSITS_LIMIT>,
        pub pending_partial_withdrawals:
            List<PendingPartialWithdrawal, PENDING_PARTIAL_WITHDRAWALS_LIMIT>,
        pub pending_consolidations: List<PendingConsolidation, PENDING_CONSOLIDATIONS_LIMIT>,
        /// Proposer indices for the current and next epoch (EIP-7917)
        pub proposer_lookahead: Vector<u64, PROPOSER_LOOKAHEAD_LENGTH>,
    }
}

ssz_container! {
    /// Fulu beacon block (unsigned)
    pub struct BeaconBlockFulu {
        pub slot: u64,
        pub proposer_index: u64,
        pub parent_root: Root,
        pub state_root: Root,
        pub body: BeaconBlockBodyElectra,
    }
}

impl_state_view!(BeaconStateFulu, FULU);
impl_block_view!(BeaconBlockFulu, FULU);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{field_count, field_index, generalized_index_for_validators};

    #[test]
    fn test_state_layout_matches_declared_fields() {
        assert_eq!(field_count::<BeaconStateFulu>(), FULU.state_field_count);
        assert_eq!(field_index::<BeaconStateFulu>("proposer_lookahead"), Some(37));
        assert_eq!(
            field_index::<BeaconStateFulu>("historical_summaries"),
            Some(FULU.historical_summaries_index)
        );
        assert_eq!(generalized_index_for_validators::<BeaconStateFulu>(), 75);
    }

    #[test]
    fn test_block_layout_matches_declared_fields() {
        assert_eq!(field_count::<BeaconBlockFulu>(), FULU.block_field_count);
        assert_eq!(field_index::<BeaconBlockFulu>("body"), Some(FULU.body_index));
        assert_eq!(field_count::<BeaconBlockBodyElectra>(), FULU.body_field_count);
    }
}
