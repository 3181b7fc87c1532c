//! Shared Consensus SSZ Types
//!
//! Containers that appear unchanged in more than one supported fork. Every container is declared
//! through `ssz_container!`, which derives the `ssz_rs` traits and records the field list the
//! tree engine checks its layout against.

use ssz_rs::prelude::*;

use crate::layout::{
    ssz_container, Container, VALIDATOR_CREDENTIALS_PUBKEY_GINDEX,
    VALIDATOR_WITHDRAWABLE_EPOCH_GINDEX,
};
use crate::tree::{MerkleTree, Merkleized, TreeError, TreeProof};

use preset::{
    ETH1_DATA_VOTES_LIMIT, MAX_BLS_TO_EXECUTION_CHANGES, MAX_DEPOSITS, MAX_PROPOSER_SLASHINGS,
    MAX_VOLUNTARY_EXITS, MAX_WITHDRAWALS_PER_PAYLOAD, SLOTS_PER_HISTORICAL_ROOT,
    SYNC_COMMITTEE_SIZE,
};

/// Preset constants, mainnet unless `gnosis` is enabled
#[cfg(not(feature = "gnosis"))]
pub mod preset {
    /// Slots per epoch on mainnet
    pub const SLOTS_PER_EPOCH: usize = 32;
    /// Maximum withdrawals in one execution payload
    pub const MAX_WITHDRAWALS_PER_PAYLOAD: usize = 16;
    /// Eth1 votes kept per voting period (64 epochs)
    pub const ETH1_DATA_VOTES_LIMIT: usize = 64 * SLOTS_PER_EPOCH;
    /// Proposer indices cached by Fulu states: (MIN_SEED_LOOKAHEAD + 1) epochs
    pub const PROPOSER_LOOKAHEAD_LENGTH: usize = 2 * SLOTS_PER_EPOCH;

    pub use super::common_preset::*;
}

/// Preset constants, mainnet unless `gnosis` is enabled
#[cfg(feature = "gnosis")]
pub mod preset {
    /// Slots per epoch on Gnosis
    pub const SLOTS_PER_EPOCH: usize = 16;
    /// Maximum withdrawals in one execution payload
    pub const MAX_WITHDRAWALS_PER_PAYLOAD: usize = 8;
    /// Eth1 votes kept per voting period (64 epochs)
    pub const ETH1_DATA_VOTES_LIMIT: usize = 64 * SLOTS_PER_EPOCH;
    /// Proposer indices cached by Fulu states: (MIN_SEED_LOOKAHEAD + 1) epochs
    pub const PROPOSER_LOOKAHEAD_LENGTH: usize = 2 * SLOTS_PER_EPOCH;

    pub use super::common_preset::*;
}

/// Constants shared by every supported preset
mod common_preset {
    /// Maximum number of validators (2^40)
    pub const VALIDATOR_REGISTRY_LIMIT: usize = 1_099_511_627_776;
    /// Maximum historical roots and historical summaries (2^24)
    pub const HISTORICAL_ROOTS_LIMIT: usize = 16_777_216;
    /// Length of the `block_roots` and `state_roots` vectors
    pub const SLOTS_PER_HISTORICAL_ROOT: usize = 8192;
    pub const EPOCHS_PER_HISTORICAL_VECTOR: usize = 65_536;
    pub const EPOCHS_PER_SLASHINGS_VECTOR: usize = 8192;
    pub const SYNC_COMMITTEE_SIZE: usize = 512;
    pub const MAX_VALIDATORS_PER_COMMITTEE: usize = 2048;
    pub const MAX_COMMITTEES_PER_SLOT: usize = 64;
    pub const MAX_PROPOSER_SLASHINGS: usize = 16;
    pub const MAX_ATTESTER_SLASHINGS: usize = 2;
    pub const MAX_ATTESTATIONS: usize = 128;
    pub const MAX_ATTESTER_SLASHINGS_ELECTRA: usize = 1;
    pub const MAX_ATTESTATIONS_ELECTRA: usize = 8;
    pub const MAX_DEPOSITS: usize = 16;
    pub const MAX_VOLUNTARY_EXITS: usize = 16;
    pub const MAX_BLS_TO_EXECUTION_CHANGES: usize = 16;
    pub const MAX_BLOB_COMMITMENTS_PER_BLOCK: usize = 4096;
    pub const MAX_BYTES_PER_TRANSACTION: usize = 1_073_741_824;
    pub const MAX_TRANSACTIONS_PER_PAYLOAD: usize = 1_048_576;
    pub const MAX_EXTRA_DATA_BYTES: usize = 32;
    pub const DEPOSIT_CONTRACT_TREE_DEPTH: usize = 32;
    pub const PENDING_DEPOSITS_LIMIT: usize = 134_217_728;
    pub const PENDING_PARTIAL_WITHDRAWALS_LIMIT: usize = 134_217_728;
    pub const PENDING_CONSOLIDATIONS_LIMIT: usize = 262_144;
    pub const MAX_DEPOSIT_REQUESTS_PER_PAYLOAD: usize = 8192;
    pub const MAX_WITHDRAWAL_REQUESTS_PER_PAYLOAD: usize = 16;
    pub const MAX_CONSOLIDATION_REQUESTS_PER_PAYLOAD: usize = 2;
}

/// 32-byte SSZ root
pub type Root = [u8; 32];
pub type BlsPublicKey = Vector<u8, 48>;
pub type BlsSignature = Vector<u8, 96>;
pub type KzgCommitment = Vector<u8, 48>;
pub type ExecutionAddress = [u8; 20];
pub type Transaction = List<u8, { preset::MAX_BYTES_PER_TRANSACTION }>;

// ============================================================================
// State components
// ============================================================================

ssz_container! {
    /// Fork data
    pub struct Fork {
        pub previous_version: [u8; 4],
        pub current_version: [u8; 4],
        pub epoch: u64,
    }
}

ssz_container! {
    /// Checkpoint for fork choice
    pub struct Checkpoint {
        pub epoch: u64,
        pub root: Root,
    }
}

ssz_container! {
    /// Beacon block header
    pub struct BeaconBlockHeader {
        /// Slot number
        pub slot: u64,
        /// Proposer validator index
        pub proposer_index: u64,
        /// Root of the parent block
        pub parent_root: Root,
        /// Root of the beacon state
        pub state_root: Root,
        /// Root of the block body
        pub body_root: Root,
    }
}

ssz_container! {
    /// Eth1 deposit data
    pub struct Eth1Data {
        pub deposit_root: Root,
        pub deposit_count: u64,
        pub block_hash: Root,
    }
}

ssz_container! {
    /// Validator record from the beacon state
    pub struct Validator {
        /// BLS public key (48 bytes)
        pub pubkey: BlsPublicKey,
        /// Withdrawal credentials (32 bytes)
        pub withdrawal_credentials: Root,
        /// Effective balance in Gwei
        pub effective_balance: u64,
        /// Whether the validator is slashed
        pub slashed: bool,
        /// Epoch when validator became eligible for activation
        pub activation_eligibility_epoch: u64,
        /// Epoch when validator was activated
        pub activation_epoch: u64,
        /// Epoch when validator will exit
        pub exit_epoch: u64,
        /// Epoch when validator can withdraw
        pub withdrawable_epoch: u64,
    }
}

ssz_container! {
    /// Per-era commitment to the `block_roots` and `state_roots` vectors
    pub struct HistoricalSummary {
        pub block_summary_root: Root,
        pub state_summary_root: Root,
    }
}

ssz_container! {
    /// Sync committee (Altair+)
    pub struct SyncCommittee {
        pub pubkeys: Vector<BlsPublicKey, SYNC_COMMITTEE_SIZE>,
        pub aggregate_pubkey: BlsPublicKey,
    }
}

ssz_container! {
    pub struct ExecutionPayloadHeader {
        pub parent_hash: Root,
        pub fee_recipient: ExecutionAddress,
        pub state_root: Root,
        pub receipts_root: Root,
        pub logs_bloom: Vector<u8, 256>,
        pub prev_randao: Root,
        pub block_number: u64,
        pub gas_limit: u64,
        pub gas_used: u64,
        pub timestamp: u64,
        pub extra_data: List<u8, { preset::MAX_EXTRA_DATA_BYTES }>,
        pub base_fee_per_gas: U256,
        pub block_hash: Root,
        pub transactions_root: Root,
        pub withdrawals_root: Root,
        pub blob_gas_used: u64,
        pub excess_blob_gas: u64,
    }
}

ssz_container! {
    /// Pending deposit entry (Electra)
    pub struct PendingDeposit {
        pub pubkey: BlsPublicKey,
        pub withdrawal_credentials: Root,
        pub amount: u64,
        pub signature: BlsSignature,
        pub slot: u64,
    }
}

ssz_container! {
    /// Pending partial withdrawal (Electra)
    pub struct PendingPartialWithdrawal {
        pub validator_index: u64,
        pub amount: u64,
        pub withdrawable_epoch: u64,
    }
}

ssz_container! {
    /// Pending consolidation entry (Electra)
    pub struct PendingConsolidation {
        pub source_index: u64,
        pub target_index: u64,
    }
}

// ============================================================================
// Block components
// ============================================================================

ssz_container! {
    pub struct SignedBeaconBlockHeader {
        pub message: BeaconBlockHeader,
        pub signature: BlsSignature,
    }
}

ssz_container! {
    pub struct ProposerSlashing {
        pub signed_header_1: SignedBeaconBlockHeader,
        pub signed_header_2: SignedBeaconBlockHeader,
    }
}

ssz_container! {
    pub struct AttestationData {
        pub slot: u64,
        pub index: u64,
        pub beacon_block_root: Root,
        pub source: Checkpoint,
        pub target: Checkpoint,
    }
}

ssz_container! {
    /// Pre-Electra indexed attestation
    pub struct IndexedAttestation {
        pub attesting_indices: List<u64, { preset::MAX_VALIDATORS_PER_COMMITTEE }>,
        pub data: AttestationData,
        pub signature: BlsSignature,
    }
}

ssz_container! {
    pub struct AttesterSlashing {
        pub attestation_1: IndexedAttestation,
        pub attestation_2: IndexedAttestation,
    }
}

ssz_container! {
    /// Pre-Electra attestation
    pub struct Attestation {
        pub aggregation_bits: Bitlist<{ preset::MAX_VALIDATORS_PER_COMMITTEE }>,
        pub data: AttestationData,
        pub signature: BlsSignature,
    }
}

ssz_container! {
    /// Indexed attestation spanning every committee of a slot (EIP-7549)
    pub struct IndexedAttestationElectra {
        pub attesting_indices: List<
            u64,
            { preset::MAX_VALIDATORS_PER_COMMITTEE * preset::MAX_COMMITTEES_PER_SLOT },
        >,
        pub data: AttestationData,
        pub signature: BlsSignature,
    }
}

ssz_container! {
    pub struct AttesterSlashingElectra {
        pub attestation_1: IndexedAttestationElectra,
        pub attestation_2: IndexedAttestationElectra,
    }
}

ssz_container! {
    /// Attestation with committee bits (EIP-7549)
    pub struct AttestationElectra {
        pub aggregation_bits: Bitlist<
            { preset::MAX_VALIDATORS_PER_COMMITTEE * preset::MAX_COMMITTEES_PER_SLOT },
        >,
        pub data: AttestationData,
        pub signature: BlsSignature,
        pub committee_bits: Bitvector<{ preset::MAX_COMMITTEES_PER_SLOT }>,
    }
}

ssz_container! {
    pub struct DepositData {
        pub pubkey: BlsPublicKey,
        pub withdrawal_credentials: Root,
        pub amount: u64,
        pub signature: BlsSignature,
    }
}

ssz_container! {
    pub struct Deposit {
        pub proof: Vector<Root, { preset::DEPOSIT_CONTRACT_TREE_DEPTH + 1 }>,
        pub data: DepositData,
    }
}

ssz_container! {
    pub struct VoluntaryExit {
        pub epoch: u64,
        pub validator_index: u64,
    }
}

ssz_container! {
    pub struct SignedVoluntaryExit {
        pub message: VoluntaryExit,
        pub signature: BlsSignature,
    }
}

ssz_container! {
    pub struct SyncAggregate {
        pub sync_committee_bits: Bitvector<SYNC_COMMITTEE_SIZE>,
        pub sync_committee_signature: BlsSignature,
    }
}

ssz_container! {
    /// Execution-layer payout record
    pub struct Withdrawal {
        pub index: u64,
        pub validator_index: u64,
        pub address: ExecutionAddress,
        pub amount: u64,
    }
}

ssz_container! {
    pub struct ExecutionPayload {
        pub parent_hash: Root,
        pub fee_recipient: ExecutionAddress,
        pub state_root: Root,
        pub receipts_root: Root,
        pub logs_bloom: Vector<u8, 256>,
        pub prev_randao: Root,
        pub block_number: u64,
        pub gas_limit: u64,
        pub gas_used: u64,
        pub timestamp: u64,
        pub extra_data: List<u8, { preset::MAX_EXTRA_DATA_BYTES }>,
        pub base_fee_per_gas: U256,
        pub block_hash: Root,
        pub transactions: List<Transaction, { preset::MAX_TRANSACTIONS_PER_PAYLOAD }>,
        pub withdrawals: List<Withdrawal, MAX_WITHDRAWALS_PER_PAYLOAD>,
        pub blob_gas_used: u64,
        pub excess_blob_gas: u64,
    }
}

ssz_container! {
    pub struct BlsToExecutionChange {
        pub validator_index: u64,
        pub from_bls_pubkey: BlsPublicKey,
        pub to_execution_address: ExecutionAddress,
    }
}

ssz_container! {
    pub struct SignedBlsToExecutionChange {
        pub message: BlsToExecutionChange,
        pub signature: BlsSignature,
    }
}

ssz_container! {
    pub struct DepositRequest {
        pub pubkey: BlsPublicKey,
        pub withdrawal_credentials: Root,
        pub amount: u64,
        pub signature: BlsSignature,
        pub index: u64,
    }
}

ssz_container! {
    pub struct WithdrawalRequest {
        pub source_address: ExecutionAddress,
        pub validator_pubkey: BlsPublicKey,
        pub amount: u64,
    }
}

ssz_container! {
    pub struct ConsolidationRequest {
        pub source_address: ExecutionAddress,
        pub source_pubkey: BlsPublicKey,
        pub target_pubkey: BlsPublicKey,
    }
}

ssz_container! {
    /// Execution-layer requests carried by Electra and later bodies
    pub struct ExecutionRequests {
        pub deposits: List<DepositRequest, { preset::MAX_DEPOSIT_REQUESTS_PER_PAYLOAD }>,
        pub withdrawals: List<WithdrawalRequest, { preset::MAX_WITHDRAWAL_REQUESTS_PER_PAYLOAD }>,
        pub consolidations:
            List<ConsolidationRequest, { preset::MAX_CONSOLIDATION_REQUESTS_PER_PAYLOAD }>,
    }
}

/// Body list types shared by every fork
pub type ProposerSlashings = List<ProposerSlashing, MAX_PROPOSER_SLASHINGS>;
pub type Deposits = List<Deposit, MAX_DEPOSITS>;
pub type VoluntaryExits = List<SignedVoluntaryExit, MAX_VOLUNTARY_EXITS>;
pub type BlsToExecutionChanges = List<SignedBlsToExecutionChange, MAX_BLS_TO_EXECUTION_CHANGES>;
pub type BlobKzgCommitments = List<KzgCommitment, { preset::MAX_BLOB_COMMITMENTS_PER_BLOCK }>;
pub type Eth1DataVotes = List<Eth1Data, ETH1_DATA_VOTES_LIMIT>;
/// One era of `block_roots` or `state_roots`
pub type SlotRoots = Vector<Root, SLOTS_PER_HISTORICAL_ROOT>;

// ============================================================================
// Trees
// ============================================================================

impl Merkleized for Validator {
    fn tree(&self) -> Result<MerkleTree, TreeError> {
        self.flat_tree()
    }
}

impl Merkleized for BeaconBlockHeader {
    fn tree(&self) -> Result<MerkleTree, TreeError> {
        self.flat_tree()
    }
}

impl Validator {
    /// Proof of `withdrawable_epoch` against this validator's root.
    ///
    /// # Errors
    /// Returns an error if the validator cannot be merkleized.
    pub fn withdrawable_epoch_proof(&self) -> Result<TreeProof, TreeError> {
        self.tree()?.prove(VALIDATOR_WITHDRAWABLE_EPOCH_GINDEX)
    }

    /// Proof of the node joining `pubkey` and `withdrawal_credentials`.
    ///
    /// The leaf is `hash(hash_tree_root(pubkey), withdrawal_credentials)`, so a verifier
    /// checks both values with a single two-sibling proof.
    ///
    /// # Errors
    /// Returns an error if the validator cannot be merkleized.
    pub fn credentials_pubkey_proof(&self) -> Result<TreeProof, TreeError> {
        self.tree()?.prove(VALIDATOR_CREDENTIALS_PUBKEY_GINDEX)
    }
}

/// Two-field view over one era's `block_roots` and `state_roots`.
///
/// Its root is the root of the `HistoricalSummary` appended for that era, which lets a
/// historical block root be proven against a summary entry.
#[derive(Debug, Clone, Copy)]
pub struct HistoricalSummaryLists<'a> {
    pub block_roots: &'a [Root],
    pub state_roots: &'a [Root],
}

impl<'a> HistoricalSummaryLists<'a> {
    #[must_use]
    pub fn new(block_roots: &'a [Root], state_roots: &'a [Root]) -> Self {
        Self {
            block_roots,
            state_roots,
        }
    }

    /// The summary entry committing to these lists.
    ///
    /// # Errors
    /// Returns an error if either slice is longer than `SLOTS_PER_HISTORICAL_ROOT`.
    pub fn summary(&self) -> Result<HistoricalSummary, TreeError> {
        Ok(HistoricalSummary {
            block_summary_root: roots_vector(self.block_roots)?.root(),
            state_summary_root: roots_vector(self.state_roots)?.root(),
        })
    }
}

impl Merkleized for HistoricalSummaryLists<'_> {
    fn tree(&self) -> Result<MerkleTree, TreeError> {
        let block_roots = roots_vector(self.block_roots)?;
        let state_roots = roots_vector(self.state_roots)?;
        Ok(MerkleTree::branch(block_roots, state_roots))
    }
}

/// Tree of a `Vector<Root, SLOTS_PER_HISTORICAL_ROOT>` given as a slice.
pub(crate) fn roots_vector(roots: &[Root]) -> Result<MerkleTree, TreeError> {
    MerkleTree::vector(
        roots.iter().copied().map(MerkleTree::leaf).collect(),
        SLOTS_PER_HISTORICAL_ROOT as u64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gindex::GindexCalculator;
    use crate::layout::{field_count, HISTORICAL_BLOCK_ROOTS_GINDEX};
    use crate::tree::root_of;

    fn sample_validator() -> Validator {
        let mut validator = Validator::default();
        validator.pubkey[0] = 0xaa;
        validator.withdrawal_credentials[0] = 0x01;
        validator.withdrawal_credentials[12..32].copy_from_slice(&[0xab; 20]);
        validator.effective_balance = 32_000_000_000;
        validator.activation_epoch = 100;
        validator.exit_epoch = u64::MAX;
        validator.withdrawable_epoch = 4242;
        validator
    }

    fn verify(leaf: [u8; 32], branch: &[[u8; 32]], gindex: u64, root: [u8; 32]) {
        let branch: Vec<Node> = branch
            .iter()
            .map(|b| Node::try_from(b.as_slice()).unwrap())
            .collect();
        ssz_rs::proofs::is_valid_merkle_branch_for_generalized_index(
            Node::try_from(leaf.as_slice()).unwrap(),
            &branch,
            gindex as usize,
            Node::try_from(root.as_slice()).unwrap(),
        )
        .expect("proof should verify");
    }

    #[test]
    fn test_declared_field_counts() {
        assert_eq!(field_count::<BeaconBlockHeader>(), 5);
        assert_eq!(field_count::<Validator>(), 8);
        assert_eq!(field_count::<ExecutionPayload>(), 17);
        assert_eq!(field_count::<ExecutionPayloadHeader>(), 17);
        assert_eq!(field_count::<ExecutionRequests>(), 3);
    }

    #[test]
    fn test_flat_tree_matches_ssz_rs() {
        let validator = sample_validator();
        assert_eq!(validator.tree().unwrap().root(), root_of(&validator).unwrap());

        let header = BeaconBlockHeader {
            slot: 12345,
            proposer_index: 42,
            parent_root: [1u8; 32],
            state_root: [2u8; 32],
            body_root: [3u8; 32],
        };
        assert_eq!(header.tree().unwrap().root(), root_of(&header).unwrap());

        let mut payload = ExecutionPayload::default();
        payload.block_number = 7;
        payload.withdrawals.push(Withdrawal {
            index: 1,
            validator_index: 2,
            address: [3u8; 20],
            amount: 4,
        });
        assert_eq!(payload.flat_tree().unwrap().root(), root_of(&payload).unwrap());
    }

    #[test]
    fn test_withdrawable_epoch_proof_verifies() {
        let validator = sample_validator();
        let proof = validator.withdrawable_epoch_proof().unwrap();

        let mut expected_leaf = [0u8; 32];
        expected_leaf[..8].copy_from_slice(&4242u64.to_le_bytes());
        assert_eq!(proof.leaf, expected_leaf);
        assert_eq!(proof.hashes.len(), 3);

        verify(
            proof.leaf,
            &proof.hashes,
            VALIDATOR_WITHDRAWABLE_EPOCH_GINDEX,
            root_of(&validator).unwrap(),
        );
    }

    #[test]
    fn test_credentials_pubkey_proof_verifies() {
        let validator = sample_validator();
        let proof = validator.credentials_pubkey_proof().unwrap();

        let pubkey_root = root_of(&validator.pubkey).unwrap();
        assert_eq!(
            proof.leaf,
            crate::tree::hash_pair(&pubkey_root, &validator.withdrawal_credentials)
        );
        assert_eq!(proof.hashes.len(), 2);

        verify(
            proof.leaf,
            &proof.hashes,
            VALIDATOR_CREDENTIALS_PUBKEY_GINDEX,
            root_of(&validator).unwrap(),
        );
    }

    #[test]
    fn test_historical_summary_lists_root_matches_summary() {
        let mut block_roots = SlotRoots::default();
        let mut state_roots = SlotRoots::default();
        for i in 0..SLOTS_PER_HISTORICAL_ROOT {
            block_roots[i][..8].copy_from_slice(&(i as u64).to_le_bytes());
            state_roots[i][..8].copy_from_slice(&(i as u64 + 1).to_le_bytes());
        }

        let lists = HistoricalSummaryLists::new(&block_roots, &state_roots);
        let summary = lists.summary().unwrap();
        assert_eq!(summary.block_summary_root, root_of(&block_roots).unwrap());
        assert_eq!(summary.state_summary_root, root_of(&state_roots).unwrap());
        assert_eq!(lists.tree().unwrap().root(), root_of(&summary).unwrap());

        let gindex = GindexCalculator::vector_element(
            HISTORICAL_BLOCK_ROOTS_GINDEX,
            SLOTS_PER_HISTORICAL_ROOT as u64,
            77,
        );
        let proof = lists.tree().unwrap().prove(gindex).unwrap();
        assert_eq!(proof.leaf, block_roots[77]);
        verify(proof.leaf, &proof.hashes, gindex, root_of(&summary).unwrap());
    }

    #[test]
    fn test_oversized_roots_are_rejected() {
        let roots = vec![[0u8; 32]; SLOTS_PER_HISTORICAL_ROOT + 1];
        let lists = HistoricalSummaryLists::new(&roots, &roots);
        assert!(matches!(
            lists.summary(),
            Err(TreeError::TooManyLeaves { .. })
        ));
    }
}
