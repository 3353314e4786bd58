//! Deterministic family of `h` independent 64-bit hashes over byte strings.
//!
//! Each family member is an `XxHash64` instance seeded by mixing the
//! family's base seed with the member's index, so two distinct members are
//! (to the extent `XxHash64` itself is a good hash) independent, and the
//! whole family is reproducible across runs given the same seed (the
//! property §4.5 and §6's serialized seed both rely on).

use std::hash::Hasher;
use twox_hash::XxHash64;

/// A deterministic vector of `h` independent string -> u64 hash functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashFamily {
    seed: u64,
    h: usize,
}

impl HashFamily {
    pub fn new(h: usize, seed: u64) -> Self {
        HashFamily { seed, h: h.max(1) }
    }

    pub fn num_hashes(&self) -> usize {
        self.h
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Per-member seed: base seed mixed with the member index via a fixed
    /// odd multiplier.
    fn member_seed(&self, member: usize) -> u64 {
        self.seed ^ (member as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    /// The `member`-th hash of `data`, `member` in `[0, h)`.
    pub fn hash(&self, member: usize, data: &[u8]) -> u64 {
        let mut hasher = XxHash64::with_seed(self.member_seed(member));
        hasher.write(data);
        hasher.finish()
    }

    /// All `h` hashes of `data`, in member order.
    pub fn hash_all(&self, data: &[u8]) -> Vec<u64> {
        (0..self.h).map(|i| self.hash(i, data)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_hashes() {
        let a = HashFamily::new(4, 1234);
        let b = HashFamily::new(4, 1234);
        assert_eq!(a.hash_all(b"ACGT"), b.hash_all(b"ACGT"));
    }

    #[test]
    fn different_seeds_usually_differ() {
        let a = HashFamily::new(4, 1234);
        let b = HashFamily::new(4, 5678);
        assert_ne!(a.hash_all(b"ACGT"), b.hash_all(b"ACGT"));
    }

    #[test]
    fn members_are_pairwise_distinct_hash_functions() {
        let family = HashFamily::new(8, 42);
        let hashes = family.hash_all(b"ACGTACGTACGT");
        let unique: std::collections::HashSet<_> = hashes.iter().collect();
        assert_eq!(unique.len(), hashes.len());
    }

    #[test]
    fn h_is_clamped_to_at_least_one() {
        let family = HashFamily::new(0, 1);
        assert_eq!(family.num_hashes(), 1);
    }
}
