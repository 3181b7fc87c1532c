//! # Beacon Proofs
//!
//! SSZ Merkle proofs for facts inside Deneb, Electra and Fulu beacon states and blocks:
//! - `validators[i].withdrawable_epoch`, `validators[i]` credentials and pubkey, `validators[i]`
//! - `slot`, `block_roots[slot % 8192]` and `historical_summaries[era]`
//! - `block_roots[slot % 8192]` inside an era-final state's historical summary
//! - `body.execution_payload.withdrawals[i]`
//!
//! State proofs verify against the root of the block header that commits to the state. Block
//! proofs verify against the block root.

pub mod block_prover;
pub mod deneb;
pub mod dispatch;
pub mod electra;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod fulu;
pub mod gindex;
pub mod layout;
pub mod proof;
pub mod state_prover;
pub mod tree;
pub mod types;

pub use block_prover::{BeaconBlockProofs, BlockView};
pub use deneb::{BeaconBlockBodyDeneb, BeaconBlockDeneb, BeaconStateDeneb};
pub use dispatch::{AnyBeaconBlock, AnyBeaconState};
pub use electra::{BeaconBlockBodyElectra, BeaconBlockElectra, BeaconStateElectra};
pub use fulu::{BeaconBlockFulu, BeaconStateFulu};
pub use gindex::{GeneralizedIndex, GindexCalculator};
pub use layout::{ForkLayout, ForkName};
pub use proof::{ErrorKind, MerkleProof, ProofError, ProofKind, ProofVector};
pub use state_prover::{BeaconStateProofs, StateView};
pub use tree::{Hash256, MerkleTree, Merkleized, TreeError, TreeProof};
pub use types::*;
