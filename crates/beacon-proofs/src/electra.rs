//! Electra BeaconState and BeaconBlock
//!
//! Electra appends nine fields after `historical_summaries`, which pushes the state past 32
//! fields: the chunk ceiling becomes 64 and `validators` moves to gindex 75. Fields proofs walk
//! through keep their indices.

use ssz_rs::prelude::*;

use crate::block_prover::impl_block_view;
use crate::layout::{ssz_container, ELECTRA};
use crate::state_prover::impl_state_view;
use crate::types::preset::{
    EPOCHS_PER_HISTORICAL_VECTOR, EPOCHS_PER_SLASHINGS_VECTOR, HISTORICAL_ROOTS_LIMIT,
    MAX_ATTESTATIONS_ELECTRA, MAX_ATTESTER_SLASHINGS_ELECTRA, PENDING_CONSOLIDATIONS_LIMIT,
    PENDING_DEPOSITS_LIMIT, PENDING_PARTIAL_WITHDRAWALS_LIMIT, VALIDATOR_REGISTRY_LIMIT,
};
use crate::types::{
    AttestationElectra, AttesterSlashingElectra, BeaconBlockHeader, BlobKzgCommitments,
    BlsSignature, BlsToExecutionChanges, Checkpoint, Deposits, Eth1Data, Eth1DataVotes,
    ExecutionPayload, ExecutionPayloadHeader, ExecutionRequests, Fork, HistoricalSummary,
    PendingConsolidation, PendingDeposit, PendingPartialWithdrawal, ProposerSlashings, Root,
    SlotRoots, SyncAggregate, SyncCommittee, Validator, VoluntaryExits,
};

ssz_container! {
    /// Electra beacon state
    pub struct BeaconStateElectra {
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
        // Field 28-36: EIP-7251 balance churn and pending queues
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
    }
}

ssz_container! {
    /// Electra block body, shared with Fulu
    pub struct BeaconBlockBodyElectra {
        pub randao_reveal: BlsSignature,
        pub eth1_data: Eth1Data,
        pub graffiti: Root,
        pub proposer_slashings: ProposerSlashings,
        pub attester_slashings: List<AttesterSlashingElectra, MAX_ATTESTER_SLASHINGS_ELECTRA>,
        pub attestations: List<AttestationElectra, MAX_ATTESTATIONS_ELECTRA>,
        pub deposits: Deposits,
        pub voluntary_exits: VoluntaryExits,
        pub sync_aggregate: SyncAggregate,
        pub execution_payload: ExecutionPayload,
        pub bls_to_execution_changes: BlsToExecutionChanges,
        pub blob_kzg_commitments: BlobKzgCommitments,
        pub execution_requests: ExecutionRequests,
    }
}

ssz_container! {
    /// Electra beacon block (unsigned)
    pub struct BeaconBlockElectra {
        pub slot: u64,
        pub proposer_index: u64,
        pub parent_root: Root,
        pub state_root: Root,
        pub body: BeaconBlockBodyElectra,
    }
}

impl_state_view!(BeaconStateElectra, ELECTRA);
impl_block_view!(BeaconBlockElectra, ELECTRA);
