//! Per-Fork Field Layouts
//!
//! Field counts and field positions for every container a proof walks through. Proof paths
//! only ever target fields that later forks append after, so the indices are shared and only
//! the chunk ceilings move between forks.

use std::any::TypeId;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::gindex::{power_of_two_ceil, GeneralizedIndex, GindexCalculator};
use crate::tree::{MerkleTree, TreeError};
use crate::types::preset::{
    HISTORICAL_ROOTS_LIMIT, MAX_WITHDRAWALS_PER_PAYLOAD, SLOTS_PER_HISTORICAL_ROOT,
};

/// Gindex of `state_root` inside `BeaconBlockHeader` (5 fields, ceiling 8, index 3)
pub const HEADER_STATE_ROOT_GINDEX: GeneralizedIndex = 11;

/// Gindex of `withdrawable_epoch` inside `Validator` (8 fields, index 7)
pub const VALIDATOR_WITHDRAWABLE_EPOCH_GINDEX: GeneralizedIndex = 15;

/// Gindex of the node hashing `pubkey` together with `withdrawal_credentials` inside `Validator`
pub const VALIDATOR_CREDENTIALS_PUBKEY_GINDEX: GeneralizedIndex = 4;

/// Gindex of `block_roots[0]` inside the two-field historical summary lists container
pub const HISTORICAL_BLOCK_ROOTS_GINDEX: GeneralizedIndex = 2;

/// Field index of `validators` in every supported `BeaconState`
pub const BEACON_STATE_VALIDATORS_INDEX: u64 = 11;

/// A merkleized SSZ container with a declared field list.
///
/// Implemented through [`ssz_container!`]; the field list is the single source for the
/// container's chunk width.
pub trait Container: 'static {
    /// Type name, used in error messages
    const NAME: &'static str;
    /// Field names in declaration (merkleization) order
    const FIELD_NAMES: &'static [&'static str];

    /// One opaque leaf per field, each holding that field's `hash_tree_root`.
    ///
    /// # Errors
    /// Propagates the `ssz_rs` merkleization error of any field.
    fn field_leaves(&self) -> Result<Vec<MerkleTree>, TreeError>;

    /// Tree of this container with every field left opaque.
    ///
    /// # Errors
    /// Propagates field hashing errors.
    fn flat_tree(&self) -> Result<MerkleTree, TreeError> {
        MerkleTree::container::<Self>(self.field_leaves()?)
    }
}

/// Declare an SSZ container together with its [`Container`] field list.
macro_rules! ssz_container {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field:ident : $ty:ty
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, ::ssz_rs::prelude::SimpleSerialize)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )+
        }

        impl $crate::layout::Container for $name {
            const NAME: &'static str = stringify!($name);
            const FIELD_NAMES: &'static [&'static str] = &[$(stringify!($field)),+];

            fn field_leaves(
                &self,
            ) -> Result<Vec<$crate::tree::MerkleTree>, $crate::tree::TreeError> {
                Ok(vec![$($crate::tree::MerkleTree::root_leaf(&self.$field)?),+])
            }
        }
    };
}

pub(crate) use ssz_container;

/// Process-wide field count cache, keyed by container type.
fn field_counts() -> &'static DashMap<TypeId, u64> {
    static FIELD_COUNTS: OnceLock<DashMap<TypeId, u64>> = OnceLock::new();
    FIELD_COUNTS.get_or_init(DashMap::new)
}

/// Number of fields in `C`, memoized on first use.
///
/// Concurrent first callers may both compute the count; they store the same value.
#[must_use]
pub fn field_count<C: Container>() -> u64 {
    *field_counts()
        .entry(TypeId::of::<C>())
        .or_insert_with(|| C::FIELD_NAMES.len() as u64)
}

/// Position of a named field in `C`.
#[must_use]
pub fn field_index<C: Container>(name: &str) -> Option<u64> {
    C::FIELD_NAMES
        .iter()
        .position(|field| *field == name)
        .map(|index| index as u64)
}

/// Gindex of the `validators` list for state type `S`, derived from its declared fields.
#[must_use]
pub fn generalized_index_for_validators<S: Container>() -> GeneralizedIndex {
    power_of_two_ceil(field_count::<S>()) + BEACON_STATE_VALIDATORS_INDEX
}

/// Supported consensus forks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkName {
    Deneb,
    Electra,
    Fulu,
}

impl ForkName {
    /// All supported forks, oldest first
    pub const ALL: [ForkName; 3] = [ForkName::Deneb, ForkName::Electra, ForkName::Fulu];

    /// Layout table for this fork
    #[must_use]
    pub const fn layout(self) -> &'static ForkLayout {
        match self {
            ForkName::Deneb => &DENEB,
            ForkName::Electra => &ELECTRA,
            ForkName::Fulu => &FULU,
        }
    }
}

impl fmt::Display for ForkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ForkName::Deneb => "deneb",
            ForkName::Electra => "electra",
            ForkName::Fulu => "fulu",
        })
    }
}

impl FromStr for ForkName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deneb" => Ok(ForkName::Deneb),
            "electra" => Ok(ForkName::Electra),
            "fulu" => Ok(ForkName::Fulu),
            other => Err(format!("unsupported fork: {other}")),
        }
    }
}

/// Field counts and positions for one fork's state, block, body and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkLayout {
    pub fork: ForkName,

    pub state_field_count: u64,
    pub slot_index: u64,
    pub latest_block_header_index: u64,
    pub block_roots_index: u64,
    pub state_roots_index: u64,
    pub validators_index: u64,
    pub historical_summaries_index: u64,

    pub block_field_count: u64,
    pub body_index: u64,

    pub body_field_count: u64,
    pub execution_payload_index: u64,

    pub payload_field_count: u64,
    pub withdrawals_index: u64,
}

pub const DENEB: ForkLayout = ForkLayout {
    fork: ForkName::Deneb,
    state_field_count: 28,
    slot_index: 2,
    latest_block_header_index: 4,
    block_roots_index: 5,
    state_roots_index: 6,
    validators_index: BEACON_STATE_VALIDATORS_INDEX,
    historical_summaries_index: 27,
    block_field_count: 5,
    body_index: 4,
    body_field_count: 12,
    execution_payload_index: 9,
    payload_field_count: 17,
    withdrawals_index: 14,
};

/// Electra appends nine state fields after `historical_summaries` and `execution_requests`
/// to the body.
pub const ELECTRA: ForkLayout = ForkLayout {
    fork: ForkName::Electra,
    state_field_count: 37,
    body_field_count: 13,
    ..DENEB
};

/// Fulu appends `proposer_lookahead` to the state.
pub const FULU: ForkLayout = ForkLayout {
    fork: ForkName::Fulu,
    state_field_count: 38,
    ..ELECTRA
};

impl ForkLayout {
    /// Chunk ceiling of the state container
    #[must_use]
    pub const fn state_chunk_ceil(&self) -> u64 {
        power_of_two_ceil(self.state_field_count)
    }

    /// Gindex of a top-level state field.
    #[must_use]
    pub const fn state_field(&self, field_index: u64) -> GeneralizedIndex {
        GindexCalculator::container_field(1, self.state_field_count, field_index)
    }

    #[must_use]
    pub const fn slot_gindex(&self) -> GeneralizedIndex {
        self.state_field(self.slot_index)
    }

    #[must_use]
    pub const fn validators_gindex(&self) -> GeneralizedIndex {
        self.state_field(self.validators_index)
    }

    /// Gindex of `validators[index]` in the state tree.
    #[must_use]
    pub const fn validator_gindex(&self, validator_index: u64) -> GeneralizedIndex {
        GindexCalculator::validator_gindex(validator_index, self.validators_gindex())
    }

    /// Gindex of `block_roots[slot % SLOTS_PER_HISTORICAL_ROOT]` in the state tree.
    #[must_use]
    pub const fn block_root_gindex(&self, slot: u64) -> GeneralizedIndex {
        let slots = SLOTS_PER_HISTORICAL_ROOT as u64;
        GindexCalculator::vector_element(
            self.state_field(self.block_roots_index),
            slots,
            slot % slots,
        )
    }

    /// Gindex of `historical_summaries[era]` in the state tree.
    #[must_use]
    pub const fn historical_summary_gindex(&self, era: u64) -> GeneralizedIndex {
        GindexCalculator::list_element(
            self.state_field(self.historical_summaries_index),
            HISTORICAL_ROOTS_LIMIT as u64,
            era,
        )
    }

    /// Gindex of `body.execution_payload.withdrawals[index]` in the block tree.
    #[must_use]
    pub const fn withdrawal_gindex(&self, withdrawal_index: u64) -> GeneralizedIndex {
        let body = GindexCalculator::container_field(1, self.block_field_count, self.body_index);
        let payload = GindexCalculator::container_field(
            body,
            self.body_field_count,
            self.execution_payload_index,
        );
        let withdrawals = GindexCalculator::container_field(
            payload,
            self.payload_field_count,
            self.withdrawals_index,
        );
        GindexCalculator::list_element(
            withdrawals,
            MAX_WITHDRAWALS_PER_PAYLOAD as u64,
            withdrawal_index,
        )
    }
}

/// Gindex of `block_roots[slot % SLOTS_PER_HISTORICAL_ROOT]` inside the historical summary
/// lists container.
#[must_use]
pub const fn historical_block_root_gindex(slot: u64) -> GeneralizedIndex {
    let slots = SLOTS_PER_HISTORICAL_ROOT as u64;
    GindexCalculator::vector_element(HISTORICAL_BLOCK_ROOTS_GINDEX, slots, slot % slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BeaconBlockHeader, Validator};

    #[test]
    fn test_validators_gindex_per_fork() {
        assert_eq!(DENEB.validators_gindex(), 43);
        assert_eq!(ELECTRA.validators_gindex(), 75);
        assert_eq!(FULU.validators_gindex(), 75);
        assert_eq!(DENEB.state_chunk_ceil(), 32);
        assert_eq!(ELECTRA.state_chunk_ceil(), 64);
    }

    #[test]
    fn test_shared_constants_match_declared_fields() {
        let state_root = field_index::<BeaconBlockHeader>("state_root").unwrap();
        assert_eq!(
            GindexCalculator::container_field(1, field_count::<BeaconBlockHeader>(), state_root),
            HEADER_STATE_ROOT_GINDEX
        );

        let withdrawable = field_index::<Validator>("withdrawable_epoch").unwrap();
        assert_eq!(
            GindexCalculator::container_field(1, field_count::<Validator>(), withdrawable),
            VALIDATOR_WITHDRAWABLE_EPOCH_GINDEX
        );
        // pubkey and withdrawal_credentials share the leftmost depth-2 node
        assert_eq!(field_index::<Validator>("pubkey"), Some(0));
        assert_eq!(field_index::<Validator>("withdrawal_credentials"), Some(1));
        assert_eq!(
            GindexCalculator::container_field(1, field_count::<Validator>(), 0) / 2,
            VALIDATOR_CREDENTIALS_PUBKEY_GINDEX
        );
    }

    #[test]
    fn test_field_count_is_memoized() {
        assert_eq!(field_count::<Validator>(), 8);
        assert_eq!(field_count::<Validator>(), 8);
        assert_eq!(
            field_counts().get(&TypeId::of::<Validator>()).map(|c| *c),
            Some(8)
        );
    }

    #[test]
    fn test_block_root_gindex_wraps_slot() {
        let base = DENEB.state_field(DENEB.block_roots_index) * 8192;
        assert_eq!(DENEB.block_root_gindex(0), base);
        assert_eq!(DENEB.block_root_gindex(8192 + 5), base + 5);
        assert_eq!(historical_block_root_gindex(8191), 2 * 8192 + 8191);
    }

    #[test]
    fn test_historical_summary_gindex() {
        // (32 + 27) * 2 * 2^24 + era
        assert_eq!(DENEB.historical_summary_gindex(3), 59 * 2 * (1 << 24) + 3);
        assert_eq!(ELECTRA.historical_summary_gindex(3), 91 * 2 * (1 << 24) + 3);
    }

    #[test]
    fn test_withdrawal_gindex() {
        let max = MAX_WITHDRAWALS_PER_PAYLOAD as u64;
        assert_eq!(
            DENEB.withdrawal_gindex(1),
            (((1 * 8 + 4) * 16 + 9) * 32 + 14) * 2 * max + 1
        );
        assert_eq!(DENEB.withdrawal_gindex(1), ELECTRA.withdrawal_gindex(1));
        assert_eq!(ELECTRA.withdrawal_gindex(1), FULU.withdrawal_gindex(1));
    }

    #[test]
    fn test_fork_name_round_trips_through_str() {
        for fork in ForkName::ALL {
            assert_eq!(fork.to_string().parse::<ForkName>(), Ok(fork));
            assert_eq!(fork.layout().fork, fork);
        }
        assert!("capella".parse::<ForkName>().is_err());
    }
}
