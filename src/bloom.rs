//! A Bloom filter: bit array of `m` bits plus `h` independent hashes.
//!
//! Backed by a `bitvec::BitVec` so each insert/test is a single bit
//! operation, and so the backing storage is directly the raw bit array
//! (`ceil(m/8)` bytes) the wire format expects.

use crate::hash::HashFamily;
use bitvec::prelude::*;

#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: BitVec<u8, Lsb0>,
    hashes: HashFamily,
}

impl BloomFilter {
    /// `m` bits, `h` hash functions seeded by `seed`.
    pub fn new(m: usize, h: usize, seed: u64) -> Self {
        BloomFilter {
            bits: bitvec![u8, Lsb0; 0; m.max(1)],
            hashes: HashFamily::new(h, seed),
        }
    }

    /// Given a target false-positive probability `p`, derives `m/n` and `h`:
    /// `m/n = -log2(p) / ln 2`, `h = round((m/n) * ln 2)`, clamped to a
    /// minimum of 1.
    pub fn params_for_fpp(p: f64) -> (f64, usize) {
        let size_factor = -p.log2() / std::f64::consts::LN_2;
        let h = (size_factor * std::f64::consts::LN_2).round().max(1.0) as usize;
        (size_factor, h)
    }

    pub fn num_bits(&self) -> usize {
        self.bits.len()
    }

    pub fn num_hashes(&self) -> usize {
        self.hashes.num_hashes()
    }

    pub fn seed(&self) -> u64 {
        self.hashes.seed()
    }

    pub fn insert(&mut self, data: &[u8]) {
        let m = self.bits.len() as u64;
        for i in 0..self.hashes.num_hashes() {
            let bit = (self.hashes.hash(i, data) % m) as usize;
            self.bits.set(bit, true);
        }
    }

    pub fn contains(&self, data: &[u8]) -> bool {
        let m = self.bits.len() as u64;
        (0..self.hashes.num_hashes()).all(|i| {
            let bit = (self.hashes.hash(i, data) % m) as usize;
            self.bits[bit]
        })
    }

    /// Raw bit array as bytes, `ceil(m/8)` long.
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }

    /// Reconstructs a filter from its wire components.
    pub fn from_parts(m: usize, h: usize, seed: u64, bytes: &[u8]) -> Self {
        let mut bits: BitVec<u8, Lsb0> = BitVec::from_slice(bytes);
        bits.truncate(m);
        while bits.len() < m {
            bits.push(false);
        }
        BloomFilter {
            bits,
            hashes: HashFamily::new(h, seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_contains() {
        let mut bf = BloomFilter::new(1024, 4, 7);
        bf.insert(b"ACGT");
        assert!(bf.contains(b"ACGT"));
    }

    #[test]
    fn absent_element_usually_not_contained() {
        let mut bf = BloomFilter::new(10_000, 4, 7);
        for i in 0..100u32 {
            bf.insert(&i.to_le_bytes());
        }
        assert!(!bf.contains(b"definitely-not-inserted"));
    }

    #[test]
    fn serialize_round_trip_preserves_membership() {
        let mut bf = BloomFilter::new(512, 3, 99);
        bf.insert(b"ACGTACGT");
        let bytes = bf.as_bytes().to_vec();
        let restored = BloomFilter::from_parts(512, 3, 99, &bytes);
        assert!(restored.contains(b"ACGTACGT"));
    }

    #[test]
    fn fpp_params_respect_minimum_hash_count() {
        let (_, h) = BloomFilter::params_for_fpp(0.5);
        assert!(h >= 1);
    }

    #[test]
    fn fpp_scenario_from_spec() {
        // scenario 2: bloom_fpp=0.01, 10_000 inserts, approx fpp <= 0.015
        let (size_factor, h) = BloomFilter::params_for_fpp(0.01);
        let n = 10_000usize;
        let m = (size_factor * n as f64).round() as usize;
        let mut bf = BloomFilter::new(m, h, 1);
        for i in 0..n as u32 {
            bf.insert(&i.to_le_bytes());
        }
        let k = h as f64;
        let approx = (1.0 - (-k * n as f64 / m as f64).exp()).powf(k);
        assert!(approx <= 0.015, "approx fpp {approx} too high");
    }
}
