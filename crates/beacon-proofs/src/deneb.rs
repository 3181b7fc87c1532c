//! Deneb BeaconState and BeaconBlock
//!
//! 28 state fields (chunk ceiling 32, `validators` at gindex 43) and a 12-field block body.

use ssz_rs::prelude::*;

use crate::block_prover::impl_block_view;
use crate::layout::{ssz_container, DENEB};
use crate::state_prover::impl_state_view;
use crate::types::preset::{
    EPOCHS_PER_HISTORICAL_VECTOR, EPOCHS_PER_SLASHINGS_VECTOR, HISTORICAL_ROOTS_LIMIT,
    MAX_ATTESTATIONS, MAX_ATTESTER_SLASHINGS, VALIDATOR_REGISTRY_LIMIT,
};
use crate::types::{
    Attestation, AttesterSlashing, BeaconBlockHeader, BlobKzgCommitments, BlsSignature,
    BlsToExecutionChanges, Checkpoint, Deposits, Eth1Data, Eth1DataVotes, ExecutionPayload,
    ExecutionPayloadHeader, Fork, HistoricalSummary, ProposerSlashings, Root, SlotRoots,
    SyncAggregate, SyncCommittee, Validator, VoluntaryExits,
};

ssz_container! {
    /// Deneb beacon state
    pub struct BeaconStateDeneb {
        // Field 0-1: Genesis
        pub genesis_time: u64,
        pub genesis_validators_root: Root,
        // Field 2: Slot number
        pub slot: u64,
        pub fork: Fork,
        // Field 4: Header of the latest processed block, state_root zeroed until the next slot
        pub latest_block_header: BeaconBlockHeader,
        // Field 5-6: Rolling window of the last SLOTS_PER_HISTORICAL_ROOT roots
        pub block_roots: SlotRoots,
        pub state_roots: SlotRoots,
        // Field 7: Frozen since Capella
        pub historical_roots: List<Root, HISTORICAL_ROOTS_LIMIT>,
        pub eth1_data: Eth1Data,
        pub eth1_data_votes: Eth1DataVotes,
        pub eth1_deposit_index: u64,
        // Field 11: Validator registry
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
        // Field 27: One entry per completed era since Capella
        pub historical_summaries: List<HistoricalSummary, HISTORICAL_ROOTS_LIMIT>,
    }
}

ssz_container! {
    pub struct BeaconBlockBodyDeneb {
        pub randao_reveal: BlsSignature,
        pub eth1_data: Eth1Data,
        pub graffiti: Root,
        pub proposer_slashings: ProposerSlashings,
        pub attester_slashings: List<AttesterSlashing, MAX_ATTESTER_SLASHINGS>,
        pub attestations: List<Attestation, MAX_ATTESTATIONS>,
        pub deposits: Deposits,
        pub voluntary_exits: VoluntaryExits,
        pub sync_aggregate: SyncAggregate,
        pub execution_payload: ExecutionPayload,
        pub bls_to_execution_changes: BlsToExecutionChanges,
        pub blob_kzg_commitments: BlobKzgCommitments,
    }
}

ssz_container! {
    /// Deneb beacon block (unsigned)
    pub struct BeaconBlockDeneb {
        pub slot: u64,
        pub proposer_index: u64,
        pub parent_root: Root,
        pub state_root: Root,
        pub body: BeaconBlockBodyDeneb,
    }
}

impl_state_view!(BeaconStateDeneb, DENEB);
impl_block_view!(BeaconBlockDeneb, DENEB);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{field_count, field_index, generalized_index_for_validators};

    #[test]
    fn test_state_layout_matches_declared_fields() {
        assert_eq!(field_count::<BeaconStateDeneb>(), DENEB.state_field_count);
        assert_eq!(field_index::<BeaconStateDeneb>("slot"), Some(DENEB.slot_index));
        assert_eq!(
            field_index::<BeaconStateDeneb>("latest_block_header"),
            Some(DENEB.latest_block_header_index)
        );
        assert_eq!(
            field_index::<BeaconStateDeneb>("block_roots"),
            Some(DENEB.block_roots_index)
        );
        assert_eq!(
            field_index::<BeaconStateDeneb>("state_roots"),
            Some(DENEB.state_roots_index)
        );
        assert_eq!(
            field_index::<BeaconStateDeneb>("validators"),
            Some(DENEB.validators_index)
        );
        assert_eq!(
            field_index::<BeaconStateDeneb>("historical_summaries"),
            Some(DENEB.historical_summaries_index)
        );
        assert_eq!(generalized_index_for_validators::<BeaconStateDeneb>(), 43);
    }

    #[test]
    fn test_block_layout_matches_declared_fields() {
        assert_eq!(field_count::<BeaconBlockDeneb>(), DENEB.block_field_count);
        assert_eq!(field_index::<BeaconBlockDeneb>("body"), Some(DENEB.body_index));
        assert_eq!(field_count::<BeaconBlockBodyDeneb>(), DENEB.body_field_count);
        assert_eq!(
            field_index::<BeaconBlockBodyDeneb>("execution_payload"),
            Some(DENEB.execution_payload_index)
        );
        assert_eq!(field_count::<ExecutionPayload>(), DENEB.payload_field_count);
        assert_eq!(
            field_index::<ExecutionPayload>("withdrawals"),
            Some(DENEB.withdrawals_index)
        );
    }
}
