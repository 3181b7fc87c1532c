//! Fork-tagged containers
//!
//! `AnyBeaconState` and `AnyBeaconBlock` let callers hold a state or block without naming its
//! fork at compile time. Both implement the view traits by delegation, so every proof method is
//! available on them.

use crate::block_prover::BlockView;
use crate::deneb::{BeaconBlockDeneb, BeaconStateDeneb};
use crate::electra::{BeaconBlockElectra, BeaconStateElectra};
use crate::fulu::{BeaconBlockFulu, BeaconStateFulu};
use crate::layout::{ForkLayout, ForkName};
use crate::state_prover::StateView;
use crate::tree::{root_of, Hash256, MerkleTree, TreeError};
use crate::types::{
    BeaconBlockHeader, ExecutionPayload, HistoricalSummary, Root, Validator,
};

/// A beacon state of any supported fork
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyBeaconState {
    Deneb(BeaconStateDeneb),
    Electra(BeaconStateElectra),
    Fulu(BeaconStateFulu),
}

/// An unsigned beacon block of any supported fork
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyBeaconBlock {
    Deneb(BeaconBlockDeneb),
    Electra(BeaconBlockElectra),
    Fulu(BeaconBlockFulu),
}

/// Run `$body` with `$inner` bound to whichever variant `$value` holds.
macro_rules! delegate {
    ($enum:ident, $value:expr, $inner:ident => $body:expr) => {
        match $value {
            $enum::Deneb($inner) => $body,
            $enum::Electra($inner) => $body,
            $enum::Fulu($inner) => $body,
        }
    };
}

impl AnyBeaconState {
    #[must_use]
    pub fn fork(&self) -> ForkName {
        match self {
            Self::Deneb(_) => ForkName::Deneb,
            Self::Electra(_) => ForkName::Electra,
            Self::Fulu(_) => ForkName::Fulu,
        }
    }

    /// `hash_tree_root` of the state, computed by `ssz_rs`.
    ///
    /// # Errors
    /// Returns an error if merkleization fails.
    pub fn state_root(&self) -> Result<Hash256, TreeError> {
        delegate!(AnyBeaconState, self, state => root_of(state))
    }

    /// Borrow the state as a trait object.
    #[must_use]
    pub fn as_view(&self) -> &dyn StateView {
        delegate!(AnyBeaconState, self, state => state)
    }
}

impl StateView for AnyBeaconState {
    fn layout(&self) -> &'static ForkLayout {
        self.fork().layout()
    }

    fn slot(&self) -> u64 {
        delegate!(AnyBeaconState, self, state => state.slot)
    }

    fn validators(&self) -> &[Validator] {
        delegate!(AnyBeaconState, self, state => &state.validators)
    }

    fn latest_block_header(&self) -> &BeaconBlockHeader {
        delegate!(AnyBeaconState, self, state => &state.latest_block_header)
    }

    fn block_roots(&self) -> &[Root] {
        delegate!(AnyBeaconState, self, state => &state.block_roots)
    }

    fn state_roots(&self) -> &[Root] {
        delegate!(AnyBeaconState, self, state => &state.state_roots)
    }

    fn historical_summaries(&self) -> &[HistoricalSummary] {
        delegate!(AnyBeaconState, self, state => &state.historical_summaries)
    }

    fn state_tree(&self) -> Result<MerkleTree, TreeError> {
        delegate!(AnyBeaconState, self, state => state.state_tree())
    }
}

impl AnyBeaconBlock {
    #[must_use]
    pub fn fork(&self) -> ForkName {
        match self {
            Self::Deneb(_) => ForkName::Deneb,
            Self::Electra(_) => ForkName::Electra,
            Self::Fulu(_) => ForkName::Fulu,
        }
    }

    /// `hash_tree_root` of the block, the root withdrawal proofs verify against.
    ///
    /// # Errors
    /// Returns an error if merkleization fails.
    pub fn block_root(&self) -> Result<Hash256, TreeError> {
        delegate!(AnyBeaconBlock, self, block => root_of(block))
    }

    /// Header summarizing this block. Its root equals [`Self::block_root`].
    ///
    /// # Errors
    /// Returns an error if the body cannot be merkleized.
    pub fn header(&self) -> Result<BeaconBlockHeader, TreeError> {
        delegate!(AnyBeaconBlock, self, block => Ok(BeaconBlockHeader {
            slot: block.slot,
            proposer_index: block.proposer_index,
            parent_root: block.parent_root,
            state_root: block.state_root,
            body_root: root_of(&block.body)?,
        }))
    }

    /// Borrow the block as a trait object.
    #[must_use]
    pub fn as_view(&self) -> &dyn BlockView {
        delegate!(AnyBeaconBlock, self, block => block)
    }
}

impl BlockView for AnyBeaconBlock {
    fn layout(&self) -> &'static ForkLayout {
        self.fork().layout()
    }

    fn slot(&self) -> u64 {
        delegate!(AnyBeaconBlock, self, block => block.slot)
    }

    fn execution_payload(&self) -> &ExecutionPayload {
        delegate!(AnyBeaconBlock, self, block => &block.body.execution_payload)
    }

    fn block_tree(&self) -> Result<MerkleTree, TreeError> {
        delegate!(AnyBeaconBlock, self, block => block.block_tree())
    }
}

impl From<BeaconStateDeneb> for AnyBeaconState {
    fn from(state: BeaconStateDeneb) -> Self {
        Self::Deneb(state)
    }
}

impl From<BeaconStateElectra> for AnyBeaconState {
    fn from(state: BeaconStateElectra) -> Self {
        Self::Electra(state)
    }
}

impl From<BeaconStateFulu> for AnyBeaconState {
    fn from(state: BeaconStateFulu) -> Self {
        Self::Fulu(state)
    }
}

impl From<BeaconBlockDeneb> for AnyBeaconBlock {
    fn from(block: BeaconBlockDeneb) -> Self {
        Self::Deneb(block)
    }
}

impl From<BeaconBlockElectra> for AnyBeaconBlock {
    fn from(block: BeaconBlockElectra) -> Self {
        Self::Electra(block)
    }
}

impl From<BeaconBlockFulu> for AnyBeaconBlock {
    fn from(block: BeaconBlockFulu) -> Self {
        Self::Fulu(block)
    }
}
