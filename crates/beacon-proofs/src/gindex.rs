//! Generalized Index Computation
//!
//! Pure arithmetic for walking into a merkleized SSZ tree. The root of any tree is gindex 1 and
//! the children of `g` are `2g` and `2g + 1`. Each navigation step folds into a running gindex
//! by multiply-and-add, so nested containers compose by repeated application starting from 1.

/// A node position in a virtual binary Merkle tree.
pub type GeneralizedIndex = u64;

/// Smallest power of two that is `>= n`. Returns 1 for 0 and 1.
#[must_use]
pub const fn power_of_two_ceil(n: u64) -> u64 {
    if n <= 1 {
        1
    } else {
        n.next_power_of_two()
    }
}

/// Calculator for generalized indices
#[derive(Debug, Clone, Copy)]
pub struct GindexCalculator;

impl GindexCalculator {
    /// Enter field `field_index` of a container with `field_count` fields.
    #[must_use]
    pub const fn container_field(
        gindex: GeneralizedIndex,
        field_count: u64,
        field_index: u64,
    ) -> GeneralizedIndex {
        debug_assert!(field_index < field_count);
        gindex * power_of_two_ceil(field_count) + field_index
    }

    /// Enter element `element_index` of a vector of length `capacity`.
    #[must_use]
    pub const fn vector_element(
        gindex: GeneralizedIndex,
        capacity: u64,
        element_index: u64,
    ) -> GeneralizedIndex {
        debug_assert!(element_index < capacity);
        gindex * power_of_two_ceil(capacity) + element_index
    }

    /// Enter element `element_index` of a list with maximum length `limit`.
    ///
    /// A list root is `hash(data_root, length)`, so the walk first takes the left (data) child
    /// and then descends into the fixed-capacity data subtree.
    #[must_use]
    pub const fn list_element(
        gindex: GeneralizedIndex,
        limit: u64,
        element_index: u64,
    ) -> GeneralizedIndex {
        debug_assert!(element_index < limit);
        (gindex * 2) * power_of_two_ceil(limit) + element_index
    }

    /// Gindex of `validators[index]` given the gindex of the `validators` list itself.
    #[must_use]
    pub const fn validator_gindex(
        validator_index: u64,
        validators_gindex: GeneralizedIndex,
    ) -> GeneralizedIndex {
        Self::list_element(
            validators_gindex,
            crate::types::preset::VALIDATOR_REGISTRY_LIMIT as u64,
            validator_index,
        )
    }

    /// Concatenate generalized indices along a path
    ///
    /// Given a sequence of gindices representing a path through nested structures,
    /// outermost first, compute the final gindex from the outermost root.
    #[must_use]
    pub fn concat_gindices(gindices: &[GeneralizedIndex]) -> GeneralizedIndex {
        let mut result = 1_u64;

        for &gindex in gindices {
            let depth = Self::gindex_depth(gindex);
            result = (result << depth) | (gindex ^ (1_u64 << depth));
        }

        result
    }

    /// Compute the depth (number of proof elements) for a given gindex
    #[must_use]
    pub const fn gindex_depth(gindex: GeneralizedIndex) -> u32 {
        63 - gindex.leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_power_of_two_ceil() {
        assert_eq!(power_of_two_ceil(0), 1);
        assert_eq!(power_of_two_ceil(1), 1);
        assert_eq!(power_of_two_ceil(2), 2);
        assert_eq!(power_of_two_ceil(3), 4);
        assert_eq!(power_of_two_ceil(5), 8);
        assert_eq!(power_of_two_ceil(28), 32);
        assert_eq!(power_of_two_ceil(37), 64);
        assert_eq!(power_of_two_ceil(64), 64);
        assert_eq!(power_of_two_ceil(1 << 40), 1 << 40);
    }

    #[test]
    fn test_container_field() {
        // BeaconBlockHeader: 5 fields, state_root at 3
        assert_eq!(GindexCalculator::container_field(1, 5, 3), 11);
        // Deneb state: 28 fields, validators at 11
        assert_eq!(GindexCalculator::container_field(1, 28, 11), 43);
        // Electra state: 37 fields, validators at 11
        assert_eq!(GindexCalculator::container_field(1, 37, 11), 75);
    }

    #[test]
    fn test_vector_element() {
        let block_roots = GindexCalculator::container_field(1, 28, 5);
        assert_eq!(block_roots, 37);
        assert_eq!(GindexCalculator::vector_element(block_roots, 8192, 0), 37 * 8192);
        assert_eq!(GindexCalculator::vector_element(block_roots, 8192, 8191), 37 * 8192 + 8191);
    }

    #[test]
    fn test_list_element_takes_data_child() {
        // A list of limit 4 rooted at 1: data root at 2, element 3 at 2 * 4 + 3
        assert_eq!(GindexCalculator::list_element(1, 4, 3), 11);
        // Limit rounding: limit 3 behaves like limit 4
        assert_eq!(GindexCalculator::list_element(1, 3, 2), 10);
    }

    #[test]
    fn test_validator_gindex_matches_known_values() {
        // Deneb validators list at 43
        assert_eq!(GindexCalculator::validator_gindex(0, 43), 94_557_999_988_736);
        assert_eq!(GindexCalculator::validator_gindex(111_111, 43), 94_558_000_099_847);
        assert_eq!(GindexCalculator::validator_gindex(555_555, 43), 94_558_000_544_291);
    }

    #[test]
    fn test_concat_gindices_simple() {
        assert_eq!(GindexCalculator::concat_gindices(&[11]), 11);
        assert_eq!(GindexCalculator::concat_gindices(&[]), 1);
    }

    #[test]
    fn test_concat_gindices_two_levels() {
        assert_eq!(GindexCalculator::concat_gindices(&[2, 2]), 4);
        assert_eq!(GindexCalculator::concat_gindices(&[2, 3]), 5);
        // Re-rooting a gindex under another node
        assert_eq!(GindexCalculator::concat_gindices(&[303, 5]), 303 * 4 + 1);
    }

    #[test]
    fn test_gindex_depth() {
        assert_eq!(GindexCalculator::gindex_depth(1), 0);
        assert_eq!(GindexCalculator::gindex_depth(2), 1);
        assert_eq!(GindexCalculator::gindex_depth(3), 1);
        assert_eq!(GindexCalculator::gindex_depth(4), 2);
        assert_eq!(GindexCalculator::gindex_depth(7), 2);
        assert_eq!(GindexCalculator::gindex_depth(8), 3);
    }

    proptest! {
        #[test]
        fn prop_container_field_depth(field_count in 1u64..100, raw_index in 0u64..100, parent in 1u64..1024) {
            let field_index = raw_index % field_count;
            let g = GindexCalculator::container_field(parent, field_count, field_index);
            let expected_depth = GindexCalculator::gindex_depth(parent)
                + power_of_two_ceil(field_count).trailing_zeros();
            prop_assert_eq!(GindexCalculator::gindex_depth(g), expected_depth);
            prop_assert_eq!(g & (power_of_two_ceil(field_count) - 1), field_index);
        }

        #[test]
        fn prop_stepwise_equals_concat(outer in 1u64..64, limit_log in 0u32..20, raw_index in 0u64..1024) {
            let limit = 1u64 << limit_log;
            let index = raw_index % limit;
            let stepwise = GindexCalculator::list_element(outer, limit, index);
            let concatenated = GindexCalculator::concat_gindices(&[outer, 2, limit + index]);
            prop_assert_eq!(stepwise, concatenated);
        }

        #[test]
        fn prop_concat_is_associative(a in 1u64..4096, b in 1u64..4096, c in 1u64..4096) {
            let left = GindexCalculator::concat_gindices(&[GindexCalculator::concat_gindices(&[a, b]), c]);
            let right = GindexCalculator::concat_gindices(&[a, GindexCalculator::concat_gindices(&[b, c])]);
            prop_assert_eq!(left, right);
        }
    }
}
