//! Property tests for the quantified invariants in spec §8: permutation
//! involution, wavelet-trie `at`/parallel-invariance, and Bloom correction
//! monotonicity. `proptest` generates the inputs; unit tests alongside
//! each module already cover the concrete scenarios.

use std::collections::BTreeSet;

use num_bigint::BigUint;
use proptest::prelude::*;

use annograph::annotation::{apply_permutation, compute_permutation_map};
use annograph::dbg::hash_dbg::HashDBG;
use annograph::dbg::DeBruijnGraph;
use annograph::{BloomAnnotator, EdgeIndex, ExactAnnotator, WaveletTrie};

fn arb_prefix(num_columns: usize) -> impl Strategy<Value = BTreeSet<usize>> {
    proptest::collection::btree_set(0..num_columns.max(1), 0..=num_columns)
}

/// Wires up a subscriber so `tracing::debug!`/`warn!` calls in the library
/// (e.g. `HashDBG::add_sequence`, `BloomAnnotator::test_fp_all`) have
/// somewhere to go when these tests run with `--nocapture`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

proptest! {
    /// `compute_permutation_map` always places prefix members at the
    /// front, in their original relative order, and is its own "involution
    /// up to relabeling" exactly when the prefix set already equals
    /// `{0..|prefix|}` (spec §8 "Permutation involutive-like").
    #[test]
    fn permutation_is_a_bijection_with_prefix_up_front(
        num_columns in 1usize..16,
        prefix in arb_prefix(16),
    ) {
        let prefix: BTreeSet<usize> = prefix.into_iter().filter(|&i| i < num_columns).collect();
        let map = compute_permutation_map(num_columns, &prefix);

        // It's a bijection on {0..num_columns}.
        let mut seen: Vec<bool> = vec![false; num_columns];
        for &slot in &map {
            prop_assert!(slot < num_columns);
            prop_assert!(!seen[slot]);
            seen[slot] = true;
        }

        // Every prefix column lands below every non-prefix column.
        let max_prefix_slot = prefix.iter().map(|&i| map[i]).max();
        let min_other_slot = (0..num_columns)
            .filter(|i| !prefix.contains(i))
            .map(|i| map[i])
            .min();
        if let (Some(mp), Some(mo)) = (max_prefix_slot, min_other_slot) {
            prop_assert!(mp < mo);
        }

        // Applying the map and its effect on a bit vector round-trips
        // through apply_permutation for every bit pattern.
        let bits: Vec<bool> = (0..num_columns).map(|i| i % 2 == 0).collect();
        let permuted = apply_permutation(&bits, &map);
        let mut inverse = vec![0usize; num_columns];
        for (orig, &slot) in map.iter().enumerate() {
            inverse[slot] = orig;
        }
        let restored: Vec<bool> = (0..num_columns).map(|i| permuted[map[i]]).collect();
        prop_assert_eq!(restored, bits);
    }

    /// Every reconstructed element of a wavelet trie matches the value it
    /// was built from, for arbitrary small bitsets packed into `BigUint`s
    /// (spec §8 "Wavelet trie `at`").
    #[test]
    fn wavelet_trie_at_matches_construction(
        rows in proptest::collection::vec(proptest::collection::vec(0u64..24, 0..6), 1..12),
    ) {
        let values: Vec<BigUint> = rows
            .iter()
            .map(|bits| {
                let mut v = BigUint::default();
                for &b in bits {
                    use annograph::bigint_ext::BitChunk;
                    v.set_bit(b);
                }
                v
            })
            .collect();
        let wt = WaveletTrie::from_values(&values, 1);
        prop_assert_eq!(wt.size(), values.len());
        for (i, expected) in values.iter().enumerate() {
            prop_assert_eq!(&wt.at(i).unwrap(), expected);
        }
    }

    /// Building the same sequence with `p = 1` and `p > 1` yields an
    /// identical trie (spec §8 "Parallel invariance").
    #[test]
    fn wavelet_trie_parallel_build_is_invariant(
        rows in proptest::collection::vec(proptest::collection::vec(0u64..20, 0..5), 0..40),
    ) {
        let values: Vec<BigUint> = rows
            .iter()
            .map(|bits| {
                let mut v = BigUint::default();
                for &b in bits {
                    use annograph::bigint_ext::BitChunk;
                    v.set_bit(b);
                }
                v
            })
            .collect();
        let serial = WaveletTrie::from_values(&values, 1);
        let parallel = WaveletTrie::from_values(&values, 6);
        prop_assert_eq!(serial, parallel);
    }

    /// `get_annotation_corrected` never sets a bit `get_annotation` left
    /// unset, for arbitrary DBGs and columns built from random ACGT
    /// sequences (spec §8 "Correction monotone").
    #[test]
    fn bloom_correction_never_sets_bits_raw_lacked(
        seq in "[ACGT]{20,60}",
        fpp in 0.001f64..0.05,
    ) {
        init_tracing();
        let mut dbg = HashDBG::new(4);
        dbg.add_sequence(&seq, false);
        prop_assume!(dbg.num_edges() > 0);

        let mut bloom = BloomAnnotator::with_fpp(&dbg, fpp, 13);
        bloom.add_column(&seq, None).unwrap();

        for i in 0..dbg.num_edges() {
            let e = EdgeIndex(i);
            let raw = bloom.get_annotation(e);
            let corrected = bloom.get_annotation_corrected(e, true, 50);
            for (r, c) in raw.iter().zip(corrected.iter()) {
                prop_assert!(*r || !*c);
            }
        }
    }

    /// Every edge Exact tags for a column, Bloom also reports for that
    /// column (spec §8 "Exact ⊆ Bloom"), across randomly generated
    /// sequences and a reasonably generous false-positive budget.
    #[test]
    fn exact_membership_implies_bloom_membership(
        seq in "[ACGT]{20,60}",
    ) {
        let mut dbg = HashDBG::new(4);
        dbg.add_sequence(&seq, false);
        prop_assume!(dbg.num_edges() > 0);

        let mut exact = ExactAnnotator::new(&dbg);
        let mut bloom = BloomAnnotator::with_fpp(&dbg, 0.001, 29);
        exact.add_column(&seq, false).unwrap();
        bloom.add_column(&seq, None).unwrap();

        let report = bloom.test_fp_all(&exact, 0, false);
        prop_assert!(report.all_subset());
    }
}
