//! Succinct ordered sequence of arbitrary-precision bitsets.
//!
//! Each node holds a common prefix (bits shared by every element passing
//! through it) and a [`RankBitVec`] recording, per element, which child its
//! next significant bit sends it to.

mod bitvector;

use bitvector::RankBitVec;
use num_bigint::BigUint;
use num_traits::Zero;
use rayon::join;

use crate::bigint_ext::BitChunk;
use crate::error::{AnnotationError, Result};

/// One node of the trie: a common prefix followed by a branch bit vector
/// and (at most) two children covering the remaining lower bits.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    /// Bits shared by every element reaching this node, MSB first.
    prefix: Vec<bool>,
    /// `bits[j] == false` means the `j`-th element (in the order it
    /// reaches this node) takes the `left` branch next; `true` means
    /// `right`. Empty iff this node is a leaf (the prefix accounts for
    /// every remaining bit).
    bits: RankBitVec,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    /// Builds the subtree representing `values`, each truncated (by the
    /// caller) to its low `width` bits. `p` is the remaining parallelism
    /// budget (0 or 1 = serial); subtrees are built concurrently via
    /// `rayon::join` while `p > 1`, merged in value order.
    fn build(values: &[BigUint], width: u64, p: usize) -> Option<Node> {
        if values.is_empty() || width == 0 {
            return None;
        }

        let mut prefix = Vec::new();
        let mut cur_width = width;
        while cur_width > 0 {
            let bit_pos = cur_width - 1;
            let first = values[0].test_bit(bit_pos);
            if values.iter().all(|v| v.test_bit(bit_pos) == first) {
                prefix.push(first);
                cur_width -= 1;
            } else {
                break;
            }
        }

        if cur_width == 0 {
            return Some(Node {
                prefix,
                bits: RankBitVec::new(),
                left: None,
                right: None,
            });
        }

        let branch_pos = cur_width - 1;
        let mut bits = RankBitVec::new();
        let mut left_vals = Vec::new();
        let mut right_vals = Vec::new();
        for v in values {
            let b = v.test_bit(branch_pos);
            bits.push(b);
            if b {
                right_vals.push(v.clone());
            } else {
                left_vals.push(v.clone());
            }
        }
        bits.finish();

        let (left, right) = if p > 1 && values.len() > 256 {
            join(
                || Node::build(&left_vals, branch_pos, p / 2),
                || Node::build(&right_vals, branch_pos, p / 2),
            )
        } else {
            (
                Node::build(&left_vals, branch_pos, 1),
                Node::build(&right_vals, branch_pos, 1),
            )
        };

        Some(Node {
            prefix,
            bits,
            left: left.map(Box::new),
            right: right.map(Box::new),
        })
    }

    /// Reconstructs the `i`-th element this node (covering `width` low
    /// bits of the original value) represents.
    fn at(&self, i: usize, width: u64) -> BigUint {
        let prefix_len = self.prefix.len() as u64;
        let mut value = BigUint::zero();
        let top = width - 1;
        for (offset, &bit) in self.prefix.iter().enumerate() {
            if bit {
                value.set_bit(top - offset as u64);
            }
        }
        let remaining = width - prefix_len;
        if remaining == 0 {
            return value;
        }
        let branch_pos = remaining - 1;
        let bit = self.bits.get(i);
        if bit {
            value.set_bit(branch_pos);
        }
        let next_i = if bit { self.bits.rank1(i) } else { self.bits.rank0(i) };
        if branch_pos > 0 {
            let child = if bit { &self.right } else { &self.left };
            if let Some(child) = child {
                value |= child.at(next_i, branch_pos);
            }
        }
        value
    }
}

/// A succinct ordered sequence of non-negative arbitrary-precision
/// integers, each interpreted as a bitset over columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaveletTrie {
    root: Option<Node>,
    width: u64,
    len: usize,
}

impl WaveletTrie {
    pub fn new() -> Self {
        WaveletTrie {
            root: None,
            width: 0,
            len: 0,
        }
    }

    /// Builds a trie over `values` in order. `p` is a parallelism hint
    /// (`p == 1` serial); results are bit-for-bit identical for any `p`.
    pub fn from_values(values: &[BigUint], p: usize) -> Self {
        let width = values.iter().map(|v| v.bit_length()).max().unwrap_or(0);
        let root = Node::build(values, width, p.max(1));
        WaveletTrie {
            root,
            width,
            len: values.len(),
        }
    }

    pub fn size(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The `i`-th integer this trie represents.
    pub fn at(&self, i: usize) -> Result<BigUint> {
        if i >= self.len {
            return Err(AnnotationError::OutOfRange {
                index: i,
                len: self.len,
            });
        }
        match &self.root {
            Some(node) => Ok(node.at(i, self.width)),
            None => Ok(BigUint::zero()),
        }
    }

    /// Every element, in order. Used internally by [`Self::insert`] and
    /// useful for callers that need the full sequence materialized.
    pub fn to_values(&self) -> Vec<BigUint> {
        (0..self.len).map(|i| self.at(i).expect("i < len")).collect()
    }

    /// Splices `other`'s sequence into `self` at the end.
    pub fn insert(&mut self, other: &WaveletTrie) {
        self.insert_at(other, self.len);
    }

    /// Splices `other`'s sequence into `self` at `position` (clamped to
    /// `self.len()`), yielding the sequence that results from inserting
    /// `other`'s elements, in order, at that position.
    ///
    /// Implemented as reconstruct, splice, rebuild (see DESIGN.md).
    pub fn insert_at(&mut self, other: &WaveletTrie, position: usize) {
        let pos = position.min(self.len);
        let mut values = self.to_values();
        let inserted = other.to_values();
        values.splice(pos..pos, inserted);
        *self = WaveletTrie::from_values(&values, 1);
    }
}
