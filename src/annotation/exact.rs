//! Exact hash annotation: per-column dense bitset membership over edges,
//! with permuted reads and a distinguished prefix-column set.

use std::collections::BTreeSet;
use std::io::{Read, Write};

use bitvec::prelude::*;

use super::{apply_permutation, compute_permutation_map, Column};
use crate::dbg::{DeBruijnGraph, EdgeIndex};
use crate::error::{AnnotationError, Result};
use crate::serialize::{read_bytes, read_number, write_bytes, write_number};

/// Per-column membership bitsets over the dense edge id space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExactAnnotation {
    columns: Vec<BitVec<u8, Lsb0>>,
    num_edges: usize,
}

impl ExactAnnotation {
    pub fn new(num_edges: usize) -> Self {
        ExactAnnotation {
            columns: Vec::new(),
            num_edges,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn add_column(&mut self) -> Column {
        let id = self.columns.len();
        self.columns.push(bitvec![u8, Lsb0; 0; self.num_edges]);
        Column(id)
    }

    pub fn set(&mut self, column: Column, edge: EdgeIndex) -> Result<()> {
        let bits = self.columns.get_mut(column.0).ok_or(AnnotationError::OutOfRange {
            index: column.0,
            len: self.columns.len(),
        })?;
        let idx = edge.index();
        if idx >= bits.len() {
            return Err(AnnotationError::OutOfRange {
                index: idx,
                len: bits.len(),
            });
        }
        bits.set(idx, true);
        Ok(())
    }

    pub fn contains(&self, column: Column, edge: EdgeIndex) -> bool {
        self.columns
            .get(column.0)
            .map(|bits| bits[edge.index()])
            .unwrap_or(false)
    }
}

/// Wraps [`ExactAnnotation`] with a borrowed DBG and prefix-column set.
pub struct ExactAnnotator<'g> {
    graph: &'g dyn DeBruijnGraph,
    annotation: ExactAnnotation,
    prefix_indices: BTreeSet<usize>,
}

impl<'g> ExactAnnotator<'g> {
    pub fn new(graph: &'g dyn DeBruijnGraph) -> Self {
        ExactAnnotator {
            graph,
            annotation: ExactAnnotation::new(graph.num_edges()),
            prefix_indices: BTreeSet::new(),
        }
    }

    pub fn num_columns(&self) -> usize {
        self.annotation.num_columns()
    }

    pub fn num_prefix_columns(&self) -> usize {
        self.prefix_indices.len()
    }

    pub fn size(&self) -> usize {
        self.annotation.num_edges()
    }

    /// Appends a new column tagged with `sequence`'s edges; returns the
    /// new column id.
    pub fn add_column(&mut self, sequence: &str, rooted: bool) -> Result<Column> {
        let column = self.annotation.add_column();
        self.add_sequence(sequence, column, rooted)?;
        Ok(column)
    }

    /// For each `(k+1)`-mer of `transform(sequence, rooted)`, inserts
    /// `map_kmer(kmer)` into `column`'s set. Fails with `UnknownKmer` if
    /// the DBG does not already contain a visited k-mer.
    pub fn add_sequence(&mut self, sequence: &str, column: Column, rooted: bool) -> Result<()> {
        let transformed = self.graph.transform(sequence, rooted);
        let bytes = transformed.as_bytes();
        let k1 = self.graph.k() + 1;
        if bytes.len() < k1 {
            return Ok(());
        }
        for window in bytes.windows(k1) {
            let kmer = std::str::from_utf8(window).expect("alphabet is ASCII");
            let edge = self.graph.map_kmer(kmer)?;
            self.annotation.set(column, edge)?;
        }
        Ok(())
    }

    pub fn make_column_prefix(&mut self, column: Column) {
        self.prefix_indices.insert(column.0);
    }

    pub fn clear_prefix(&mut self) {
        self.prefix_indices.clear();
    }

    pub fn prefix(&self) -> &BTreeSet<usize> {
        &self.prefix_indices
    }

    pub fn permutation_map(&self) -> Vec<usize> {
        compute_permutation_map(self.annotation.num_columns(), &self.prefix_indices)
    }

    /// Column membership bit vector for `e`, optionally permuted so the
    /// prefix columns sort to the front (spec §4.2).
    pub fn annotate_edge(&self, e: EdgeIndex) -> Vec<bool> {
        self.annotate_edge_permuted(e, false)
    }

    pub fn annotate_edge_permuted(&self, e: EdgeIndex, permute: bool) -> Vec<bool> {
        let bits: Vec<bool> = self
            .annotation
            .columns
            .iter()
            .map(|col| col[e.index()])
            .collect();
        if permute {
            apply_permutation(&bits, &self.permutation_map())
        } else {
            bits
        }
    }

    /// The set of column ids (not packed bits) for which `e` is tagged.
    pub fn annotate_edge_indices(&self, e: EdgeIndex) -> BTreeSet<usize> {
        self.annotation
            .columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col[e.index()])
            .map(|(i, _)| i)
            .collect()
    }

    /// Writes, for each edge id in order, its (optionally permuted) bit
    /// vector packed as `ceil(num_columns/8)` bytes.
    pub fn export_rows<W: Write>(&self, sink: &mut W, permute: bool) -> Result<u64> {
        let map = self.permutation_map();
        let mut written = 0u64;
        for e in 0..self.annotation.num_edges() {
            let bits: Vec<bool> = self
                .annotation
                .columns
                .iter()
                .map(|col| col[e])
                .collect();
            let bits = if permute {
                apply_permutation(&bits, &map)
            } else {
                bits
            };
            let mut row: BitVec<u8, Lsb0> = BitVec::with_capacity(bits.len());
            row.extend(bits);
            written += write_bytes(sink, row.as_raw_slice())?;
        }
        Ok(written)
    }

    /// Binary layout per spec §6: `Number num_columns`, then per-column a
    /// length-prefixed bitset of N bits, followed by the prefix-index set
    /// as `Number count` and `Number` entries.
    pub fn serialize<W: Write>(&self, out: &mut W) -> Result<u64> {
        let mut written = write_number(out, self.annotation.num_columns() as u64)?;
        for col in &self.annotation.columns {
            written += write_number(out, col.len() as u64)?;
            written += write_bytes(out, col.as_raw_slice())?;
        }
        written += write_number(out, self.prefix_indices.len() as u64)?;
        for &idx in &self.prefix_indices {
            written += write_number(out, idx as u64)?;
        }
        Ok(written)
    }

    /// Restores state previously written by [`Self::serialize`]. Returns
    /// `false`, leaving `self` untouched, on any format error.
    pub fn load<R: Read>(&mut self, input: &mut R) -> bool {
        match Self::try_load(input, self.annotation.num_edges()) {
            Ok(annotation) => {
                self.annotation = annotation.0;
                self.prefix_indices = annotation.1;
                true
            }
            Err(_) => false,
        }
    }

    fn try_load<R: Read>(
        input: &mut R,
        expected_edges: usize,
    ) -> Result<(ExactAnnotation, BTreeSet<usize>)> {
        let num_columns = read_number(input)? as usize;
        let mut columns = Vec::with_capacity(num_columns);
        for _ in 0..num_columns {
            let n_bits = read_number(input)? as usize;
            let bytes = read_bytes(input, n_bits.div_ceil(8))?;
            let mut bits: BitVec<u8, Lsb0> = BitVec::from_slice(&bytes);
            bits.truncate(n_bits);
            columns.push(bits);
        }
        let prefix_count = read_number(input)? as usize;
        let mut prefix = BTreeSet::new();
        for _ in 0..prefix_count {
            prefix.insert(read_number(input)? as usize);
        }
        let num_edges = columns.first().map(|c| c.len()).unwrap_or(expected_edges);
        Ok((
            ExactAnnotation {
                columns,
                num_edges,
            },
            prefix,
        ))
    }
}
