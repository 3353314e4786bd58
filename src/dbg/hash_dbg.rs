//! `HashDBG`: a hash-table-backed de Bruijn graph.
//!
//! Key storage is an append-only `Vec<Box<str>>` arena indexed by
//! `EdgeIndex` (`node_kmer`/`edge_label` slice directly into it), so
//! insertion under any future rehash of `indices` never invalidates a
//! previously-returned `EdgeIndex` or the string it names.

use std::collections::HashMap;
use std::io::{Read, Write};

use tracing::debug;

use super::{DeBruijnGraph, EdgeIndex};
use crate::alphabet::{self, ALPHABET, DUMMY};
use crate::error::{AnnotationError, Result};
use crate::serialize::{read_number, read_string_map, write_number, write_string_map};

#[derive(Debug, Clone)]
pub struct HashDBG {
    k: usize,
    /// `kmers[i]` is the full `(k+1)`-mer for edge `i`; append-only.
    kmers: Vec<Box<str>>,
    indices: HashMap<Box<str>, usize>,
}

impl HashDBG {
    pub fn new(k: usize) -> Self {
        HashDBG {
            k,
            kmers: Vec::new(),
            indices: HashMap::new(),
        }
    }

    /// Builds the padded `(k+1)`-mer index from `sequence`. Sequences
    /// shorter than `k+1` raw characters are silently skipped, even when
    /// `rooted == false` would have padded them long enough.
    pub fn add_sequence(&mut self, sequence: &str, rooted: bool) {
        if sequence.len() < self.k + 1 {
            return;
        }

        let transformed = self.transform(sequence, rooted);
        let bytes = transformed.as_bytes();
        if bytes.len() < self.k + 1 {
            return;
        }

        let mut inserted = 0usize;
        for window in bytes.windows(self.k + 1) {
            // `transformed` only contains ASCII Σ bytes, so any byte window is valid UTF-8.
            let kmer = std::str::from_utf8(window).expect("alphabet is ASCII");
            if !self.indices.contains_key(kmer) {
                let boxed: Box<str> = kmer.into();
                self.indices.insert(boxed.clone(), self.kmers.len());
                self.kmers.push(boxed);
                inserted += 1;
            }
        }
        debug!(
            inserted,
            total_edges = self.kmers.len(),
            "indexed sequence of length {}",
            sequence.len()
        );
    }

    fn kmer_bytes(&self, e: EdgeIndex) -> &[u8] {
        self.kmers[e.index()].as_bytes()
    }

    /// Binary layout: `Number |kmers|`, `Number k`, then the kmer ->
    /// edge_index string map.
    pub fn serialize<W: Write>(&self, out: &mut W) -> Result<u64> {
        let mut written = write_number(out, self.kmers.len() as u64)?;
        written += write_number(out, self.k as u64)?;
        let map: HashMap<String, u64> = self
            .indices
            .iter()
            .map(|(k, &v)| (k.to_string(), v as u64))
            .collect();
        written += write_string_map(out, &map)?;
        Ok(written)
    }

    /// Restores a `HashDBG` previously written by [`Self::serialize`].
    /// Fails with `Format` if the header `k` disagrees with `self`'s
    /// current `k`, or if any length prefix is corrupt/truncated.
    /// On failure `self` is left untouched.
    pub fn load<R: Read>(&mut self, input: &mut R) -> bool {
        match Self::try_load(input, self.k) {
            Ok((kmers, indices)) => {
                self.kmers = kmers;
                self.indices = indices;
                true
            }
            Err(_) => false,
        }
    }

    fn try_load<R: Read>(
        input: &mut R,
        expected_k: usize,
    ) -> Result<(Vec<Box<str>>, HashMap<Box<str>, usize>)> {
        let size = read_number(input)? as usize;
        let k = read_number(input)? as usize;
        if k != expected_k {
            return Err(AnnotationError::Format(format!(
                "header k={k} disagrees with current DBG's k={expected_k}"
            )));
        }
        let map = read_string_map(input)?;
        let mut kmers: Vec<Option<Box<str>>> = vec![None; size];
        let mut indices = HashMap::with_capacity(map.len());
        for (kmer, idx) in map {
            let idx = idx as usize;
            if idx >= size {
                return Err(AnnotationError::Format(format!(
                    "edge index {idx} out of declared range {size}"
                )));
            }
            let boxed: Box<str> = kmer.into();
            indices.insert(boxed.clone(), idx);
            kmers[idx] = Some(boxed);
        }
        let kmers = kmers
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| AnnotationError::Format(format!("missing edge index {i}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((kmers, indices))
    }
}

impl DeBruijnGraph for HashDBG {
    fn k(&self) -> usize {
        self.k
    }

    fn num_edges(&self) -> usize {
        self.kmers.len()
    }

    fn transform(&self, seq: &str, rooted: bool) -> String {
        let encoded = alphabet::encode(seq);
        if rooted {
            encoded
        } else {
            let prefix: String = std::iter::repeat(DUMMY as char).take(self.k + 1).collect();
            format!("{prefix}{encoded}{}", DUMMY as char)
        }
    }

    fn map_kmer(&self, kmer: &str) -> Result<EdgeIndex> {
        self.indices
            .get(kmer)
            .map(|&i| EdgeIndex(i))
            .ok_or_else(|| AnnotationError::UnknownKmer(kmer.to_string()))
    }

    fn node_kmer(&self, e: EdgeIndex) -> String {
        let bytes = self.kmer_bytes(e);
        String::from_utf8_lossy(&bytes[..self.k]).into_owned()
    }

    fn edge_label(&self, e: EdgeIndex) -> u8 {
        self.kmer_bytes(e)[self.k]
    }

    fn has_only_outgoing(&self, e: EdgeIndex) -> bool {
        let mut candidate = self.kmer_bytes(e).to_vec();
        let mut count = 0;
        for &c in ALPHABET.iter() {
            *candidate.last_mut().unwrap() = c;
            if self.indices.contains_key(std::str::from_utf8(&candidate).unwrap()) {
                count += 1;
            }
        }
        count == 1
    }

    fn has_only_incoming(&self, e: EdgeIndex) -> bool {
        let source = self.kmer_bytes(e)[..self.k].to_vec();
        let mut candidate = vec![0u8; self.k + 1];
        candidate[1..].copy_from_slice(&source);
        let mut count = 0;
        for &c in ALPHABET.iter() {
            candidate[0] = c;
            if self.indices.contains_key(std::str::from_utf8(&candidate).unwrap()) {
                count += 1;
            }
        }
        count == 1
    }

    fn next_edge(&self, e: EdgeIndex, c: u8) -> Result<EdgeIndex> {
        let s = self.kmer_bytes(e);
        let mut candidate = vec![0u8; self.k + 1];
        candidate[..self.k - 1].copy_from_slice(&s[1..self.k]);
        candidate[self.k - 1] = c;
        for &d in ALPHABET.iter() {
            candidate[self.k] = d;
            if let Some(&idx) = self.indices.get(std::str::from_utf8(&candidate).unwrap()) {
                return Ok(EdgeIndex(idx));
            }
        }
        Err(AnnotationError::PreconditionViolated(format!(
            "no outgoing edge from edge {} via transition {:?}",
            e.index(),
            c as char
        )))
    }

    fn prev_edge(&self, e: EdgeIndex) -> Result<EdgeIndex> {
        let s = self.kmer_bytes(e);
        let mut candidate = vec![0u8; self.k + 1];
        candidate[1..].copy_from_slice(&s[..self.k]);
        for &c in ALPHABET.iter() {
            candidate[0] = c;
            if let Some(&idx) = self.indices.get(std::str::from_utf8(&candidate).unwrap()) {
                return Ok(EdgeIndex(idx));
            }
        }
        Err(AnnotationError::PreconditionViolated(format!(
            "no incoming edge into edge {}",
            e.index()
        )))
    }
}
