//! Approximate Bloom-filter annotation with topology-aware correction
//! (spec §4.3): per-column `BloomFilter`, raw AND-of-filters membership,
//! and the unitig-walk correction that intersects neighbouring edges'
//! raw answers to purge bits no real sequence could have contributed.
//!
//! Grounded on `original_source/bloom_annotator/dbg_bloom_annotator.hpp`'s
//! `BloomAnnotator` class: both constructors (`bloom_fpp` vs explicit
//! `size_factor`/`num_hash_functions`), `get_annotation`,
//! `get_annotation_corrected`, `test_fp_all`, `approx_false_positive_rate`.

use std::io::{Read, Write};

use tracing::warn;

use super::Column;
use crate::bloom::BloomFilter;
use crate::dbg::{DeBruijnGraph, EdgeIndex};
use crate::error::{AnnotationError, Result};
use crate::serialize::{read_f64, read_number, read_bytes, write_f64, write_number, write_bytes};

use super::exact::ExactAnnotator;

/// Per-column Bloom filters plus the bookkeeping the wire format carries
/// alongside them (spec §6: `size_factor_`, `fpp_`, `sizes_v`).
#[derive(Debug, Clone, Default)]
pub struct BloomAnnotation {
    filters: Vec<BloomFilter>,
    /// Observed insertion count per column, used by
    /// [`BloomAnnotator::approx_false_positive_rate`].
    sizes_v: Vec<usize>,
}

impl BloomAnnotation {
    pub fn num_columns(&self) -> usize {
        self.filters.len()
    }
}

/// How a column's Bloom filter is sized: either a target false-positive
/// probability (spec §4.3 mode 1) or an explicit `m/n` and `h` (mode 2).
#[derive(Debug, Clone, Copy)]
enum SizePolicy {
    TargetFpp(f64),
    Explicit { size_factor: f64, h: usize },
}

pub struct BloomAnnotator<'g> {
    graph: &'g dyn DeBruijnGraph,
    policy: SizePolicy,
    size_factor: f64,
    h: usize,
    annotation: BloomAnnotation,
    seed: u64,
}

impl<'g> BloomAnnotator<'g> {
    /// Mode 1: derive `m/n` and `h` from a target false-positive
    /// probability (spec §4.3: `m/n = -log2(p)/ln2`, `h = round((m/n)*ln2)`).
    pub fn with_fpp(graph: &'g dyn DeBruijnGraph, fpp: f64, seed: u64) -> Self {
        let (size_factor, h) = BloomFilter::params_for_fpp(fpp);
        BloomAnnotator {
            graph,
            policy: SizePolicy::TargetFpp(fpp),
            size_factor,
            h,
            annotation: BloomAnnotation::default(),
            seed,
        }
    }

    /// Mode 2: explicit `size_factor` (bits per inserted element) and hash
    /// count.
    pub fn with_explicit_params(
        graph: &'g dyn DeBruijnGraph,
        size_factor: f64,
        h: usize,
        seed: u64,
    ) -> Self {
        BloomAnnotator {
            graph,
            policy: SizePolicy::Explicit { size_factor, h },
            size_factor,
            h: h.max(1),
            annotation: BloomAnnotation::default(),
            seed,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.annotation.num_columns()
    }

    pub fn num_hash_functions(&self) -> usize {
        self.h
    }

    pub fn size_factor(&self) -> f64 {
        self.size_factor
    }

    /// Appends a new column, inserting `sequence`'s (k+1)-mers into it, and
    /// returns the new column id. `num_elements`, if given, overrides the
    /// size estimate used to pick the filter's bit count; otherwise the
    /// number of (k+1)-mers in `transform(sequence, rooted=false)` is used.
    pub fn add_column(&mut self, sequence: &str, num_elements: Option<usize>) -> Result<Column> {
        let transformed = self.graph.transform(sequence, false);
        let k1 = self.graph.k() + 1;
        let windows = transformed.as_bytes().len().saturating_sub(k1.saturating_sub(1));
        let n = num_elements.unwrap_or(windows.max(1));
        let m = (self.size_factor * n as f64).round().max(1.0) as usize;
        let id = self.annotation.filters.len();
        self.annotation
            .filters
            .push(BloomFilter::new(m, self.h, self.seed.wrapping_add(id as u64)));
        self.annotation.sizes_v.push(0);
        let column = Column(id);
        self.add_sequence(sequence, column)?;
        Ok(column)
    }

    /// Inserts every (k+1)-mer of `transform(sequence, rooted=false)` into
    /// `column`'s filter (spec §4.3: Bloom inserts always use
    /// `rooted=false`, independent of how the exact annotator was fed the
    /// same sequence).
    pub fn add_sequence(&mut self, sequence: &str, column: Column) -> Result<()> {
        let filter = self
            .annotation
            .filters
            .get_mut(column.0)
            .ok_or(AnnotationError::OutOfRange {
                index: column.0,
                len: self.annotation.filters.len(),
            })?;
        let transformed = self.graph.transform(sequence, false);
        let bytes = transformed.as_bytes();
        let k1 = self.graph.k() + 1;
        if bytes.len() < k1 {
            return Ok(());
        }
        let mut inserted = 0usize;
        for window in bytes.windows(k1) {
            filter.insert(window);
            inserted += 1;
        }
        self.annotation.sizes_v[column.0] += inserted;
        Ok(())
    }

    fn kmer_of(&self, e: EdgeIndex) -> String {
        format!("{}{}", self.graph.node_kmer(e), self.graph.edge_label(e) as char)
    }

    /// Bit `c` set iff column `c`'s filter reports `e`'s (k+1)-mer present
    /// (logical AND of per-column Bloom memberships, i.e. the raw,
    /// uncorrected answer).
    pub fn get_annotation(&self, e: EdgeIndex) -> Vec<bool> {
        let kmer = self.kmer_of(e);
        self.annotation
            .filters
            .iter()
            .map(|f| f.contains(kmer.as_bytes()))
            .collect()
    }

    /// Topology-aware correction (spec §4.3): walks the unitig containing
    /// `e`, intersecting raw Bloom answers along the way. Dummy edges
    /// terminate the walk in either direction.
    pub fn get_annotation_corrected(
        &self,
        e: EdgeIndex,
        both_directions: bool,
        path_cutoff: usize,
    ) -> Vec<bool> {
        let mut a = self.get_annotation(e);

        self.walk_and_intersect(e, &mut a, path_cutoff, true);
        if both_directions {
            self.walk_and_intersect(e, &mut a, path_cutoff, false);
        }
        a
    }

    fn all_zero(bits: &[bool]) -> bool {
        bits.iter().all(|&b| !b)
    }

    fn walk_and_intersect(&self, start: EdgeIndex, a: &mut [bool], path_cutoff: usize, forward: bool) {
        let mut current = start;
        let mut steps = 0usize;
        while steps < path_cutoff && !Self::all_zero(a) {
            let one_way = if forward {
                self.graph.has_only_outgoing(current)
            } else {
                self.graph.has_only_incoming(current)
            };
            if !one_way {
                break;
            }
            let next = if forward {
                let label = self.graph.edge_label(current);
                self.graph.next_edge(current, label)
            } else {
                self.graph.prev_edge(current)
            };
            let next = match next {
                Ok(n) => n,
                Err(_) => break,
            };
            let next_kmer = format!("{}{}", self.graph.node_kmer(next), self.graph.edge_label(next) as char);
            if self.graph.is_dummy_edge(&next_kmer) {
                break;
            }
            let next_one_way = if forward {
                self.graph.has_only_incoming(next)
            } else {
                self.graph.has_only_outgoing(next)
            };
            if !next_one_way {
                break;
            }
            let next_annotation = self.get_annotation(next);
            for (bit, &other) in a.iter_mut().zip(next_annotation.iter()) {
                *bit = *bit && other;
            }
            current = next;
            steps += 1;
        }
    }

    /// `(1 - e^{-hn/m})^h`, averaged over all columns using each column's
    /// own observed insertion count and the annotator's shared `h`.
    pub fn approx_false_positive_rate(&self) -> f64 {
        if self.annotation.filters.is_empty() {
            return 0.0;
        }
        let h = self.h as f64;
        let sum: f64 = self
            .annotation
            .filters
            .iter()
            .zip(self.annotation.sizes_v.iter())
            .map(|(filter, &n)| {
                let m = filter.num_bits() as f64;
                (1.0 - (-h * n as f64 / m).exp()).powf(h)
            })
            .sum();
        sum / self.annotation.filters.len() as f64
    }

    /// Aggregates, across every edge (or the first `num` if `num > 0`),
    /// how often `ExactAnnotation.contains(c, e) => BloomAnnotation
    /// .contains(c, e)` held. Counted, never raised: per spec §7 this is
    /// the one "invariant-violated" class that surfaces as a tally rather
    /// than an error.
    pub fn test_fp_all(
        &self,
        exact: &ExactAnnotator<'_>,
        num: usize,
        both_directions: bool,
    ) -> FalsePositiveReport {
        let limit = if num == 0 { self.graph.num_edges() } else { num.min(self.graph.num_edges()) };
        let mut report = FalsePositiveReport::default();
        for i in 0..limit {
            let e = EdgeIndex(i);
            let exact_bits = exact.annotate_edge(e);
            let corrected = self.get_annotation_corrected(e, both_directions, 50);
            report.total_checked += 1;
            let mut ok = true;
            for (c, &exact_bit) in exact_bits.iter().enumerate() {
                if exact_bit {
                    report.exact_positive_bits += 1;
                    match corrected.get(c) {
                        Some(true) => {}
                        _ => {
                            ok = false;
                            report.violations += 1;
                            warn!(edge = i, column = c, "exact bit not covered by Bloom");
                        }
                    }
                }
            }
            if ok {
                report.edges_fully_subset += 1;
            }
        }
        report
    }

    /// Binary layout per spec §6: `Number num_columns`, then per column
    /// `Number m, Number h, Number seed, raw bit array`; then
    /// `size_factor_` and `fpp_` as f64, then the `sizes_v` sequence.
    pub fn serialize<W: Write>(&self, out: &mut W) -> Result<u64> {
        let mut written = write_number(out, self.annotation.filters.len() as u64)?;
        for filter in &self.annotation.filters {
            written += write_number(out, filter.num_bits() as u64)?;
            written += write_number(out, filter.num_hashes() as u64)?;
            written += write_number(out, filter.seed())?;
            written += write_bytes(out, filter.as_bytes())?;
        }
        written += write_f64(out, self.size_factor)?;
        written += write_f64(out, self.fpp())?;
        written += write_number(out, self.annotation.sizes_v.len() as u64)?;
        for &n in &self.annotation.sizes_v {
            written += write_number(out, n as u64)?;
        }
        Ok(written)
    }

    fn fpp(&self) -> f64 {
        match self.policy {
            SizePolicy::TargetFpp(p) => p,
            SizePolicy::Explicit { .. } => self.approx_false_positive_rate(),
        }
    }

    /// Restores state previously written by [`Self::serialize`]. Returns
    /// `false` (leaving `self` untouched) on any format error.
    pub fn load<R: Read>(&mut self, input: &mut R) -> bool {
        match Self::try_load(input) {
            Ok((annotation, size_factor)) => {
                self.annotation = annotation;
                self.size_factor = size_factor;
                true
            }
            Err(_) => false,
        }
    }

    fn try_load<R: Read>(input: &mut R) -> Result<(BloomAnnotation, f64)> {
        let num_columns = read_number(input)? as usize;
        let mut filters = Vec::with_capacity(num_columns);
        for _ in 0..num_columns {
            let m = read_number(input)? as usize;
            let h = read_number(input)? as usize;
            let seed = read_number(input)?;
            let bytes = read_bytes(input, m.div_ceil(8))?;
            filters.push(BloomFilter::from_parts(m, h, seed, &bytes));
        }
        let size_factor = read_f64(input)?;
        let _fpp = read_f64(input)?;
        let sizes_len = read_number(input)? as usize;
        let mut sizes_v = Vec::with_capacity(sizes_len);
        for _ in 0..sizes_len {
            sizes_v.push(read_number(input)? as usize);
        }
        Ok((BloomAnnotation { filters, sizes_v }, size_factor))
    }
}

/// Outcome of [`BloomAnnotator::test_fp_all`]: counted discrepancies
/// rather than a first-failure panic (spec §7, "invariant-violated").
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FalsePositiveReport {
    pub total_checked: usize,
    pub exact_positive_bits: usize,
    pub violations: usize,
    pub edges_fully_subset: usize,
}

impl FalsePositiveReport {
    pub fn all_subset(&self) -> bool {
        self.violations == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbg::hash_dbg::HashDBG;

    fn graph() -> HashDBG {
        let mut dbg = HashDBG::new(3);
        dbg.add_sequence("ACGTACGTTGCA", false);
        dbg
    }

    #[test]
    fn raw_annotation_has_bit_set_for_member() {
        let dbg = graph();
        let mut bloom = BloomAnnotator::with_fpp(&dbg, 0.01, 1);
        let column = bloom.add_column("ACGTACGTTGCA", None).unwrap();
        let e = dbg.map_kmer("ACGT").unwrap();
        assert!(bloom.get_annotation(e)[column.0]);
    }

    #[test]
    fn exact_subset_of_bloom_on_shared_graph() {
        // scenario 3: exact and bloom built over the same graph/columns;
        // test_fp_all reports 0 violations.
        let dbg = graph();
        let mut exact = ExactAnnotator::new(&dbg);
        let mut bloom = BloomAnnotator::with_fpp(&dbg, 0.001, 7);
        for seq in ["ACGTACGTTGCA", "ACGTACGTTGCA", "ACGTACGTTGCA"] {
            exact.add_column(seq, false).unwrap();
            bloom.add_column(seq, None).unwrap();
        }
        let report = bloom.test_fp_all(&exact, 0, false);
        assert!(report.all_subset(), "violations: {}", report.violations);
        assert_eq!(report.total_checked, dbg.num_edges());
    }

    #[test]
    fn corrected_annotation_never_sets_bits_raw_did_not_have() {
        let dbg = graph();
        let mut bloom = BloomAnnotator::with_fpp(&dbg, 0.01, 3);
        bloom.add_column("ACGTACGTTGCA", None).unwrap();
        for i in 0..dbg.num_edges() {
            let e = EdgeIndex(i);
            let raw = bloom.get_annotation(e);
            let corrected = bloom.get_annotation_corrected(e, true, 50);
            for (r, c) in raw.iter().zip(corrected.iter()) {
                assert!(*r || !*c, "corrected set a bit raw did not have");
            }
        }
    }

    #[test]
    fn serialize_round_trip_preserves_membership() {
        let dbg = graph();
        let mut bloom = BloomAnnotator::with_fpp(&dbg, 0.01, 11);
        bloom.add_column("ACGTACGTTGCA", None).unwrap();

        let mut buf = Vec::new();
        bloom.serialize(&mut buf).unwrap();

        let mut restored = BloomAnnotator::with_fpp(&dbg, 0.01, 11);
        assert!(restored.load(&mut &buf[..]));
        for i in 0..dbg.num_edges() {
            let e = EdgeIndex(i);
            assert_eq!(bloom.get_annotation(e), restored.get_annotation(e));
        }
    }

    #[test]
    fn fpp_scenario_approx_rate_bound() {
        let dbg = graph();
        let mut bloom = BloomAnnotator::with_fpp(&dbg, 0.01, 1);
        // Synthetic column sized to match the spec scenario directly
        // rather than relying on the tiny test graph's edge count.
        let column = bloom.add_column("ACGTACGTTGCA", Some(10_000)).unwrap();
        for i in 0..10_000u32 {
            let filter = &mut bloom
                .annotation
                .filters[column.0];
            filter.insert(&i.to_le_bytes());
        }
        bloom.annotation.sizes_v[column.0] = 10_000;
        assert!(bloom.approx_false_positive_rate() <= 0.015);
    }
}
