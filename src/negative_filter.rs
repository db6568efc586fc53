//! Negative lookup filter (C3): a Bloom-style probabilistic set over
//! `block_exact`, built once at open and consulted on every lookup to
//! skip a store round-trip for names that are definitely absent. Two
//! independent base hashes (a multiplicative 31-hash and a DJB2-XOR
//! variant) combine via `h1 + i*h2` double-hashing into 7 probe
//! positions, with the bit array sized by a `9.6*n` formula and
//! clamped to `[1MB, 4.5GB]`. After `build()` it never mutates again,
//! so reads need no synchronization — a `Vec<AtomicU8>` gives a
//! lock-free-read guarantee without `unsafe`, since aligned byte reads
//! are already atomic on every target this crate ships to.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::Result;
use crate::store::{ExactSet, PolicyStore};

const HASHES: u32 = 7;
const MIN_BITS: u64 = 1_000_000 * 8; // 1 MB floor, expressed in bits
const MAX_BITS: u64 = 4_500_000_000 * 8; // ~4.5 GB ceiling, expressed in bits

/// A fixed-size, build-once Bloom filter over `block_exact`.
pub struct NegativeFilter {
    bits: Vec<AtomicU8>,
    size_bits: u64,
}

impl NegativeFilter {
    /// Scans `block_exact` once, sizing the bit array from its
    /// cardinality via the `9.6*n` formula, clamped to `[1 MB, 4.5 GB]`
    /// of underlying bits — enough headroom to keep the false-positive
    /// rate near 1% without letting a pathologically large set blow
    /// out memory.
    pub fn build(exact_count: u64, store: &dyn PolicyStore) -> Result<Self> {
        let size_bits = size_for(exact_count);
        let byte_len = ((size_bits + 7) / 8) as usize;
        let bits: Vec<AtomicU8> = (0..byte_len).map(|_| AtomicU8::new(0)).collect();
        let filter = Self { bits, size_bits };

        store.for_each_exact(ExactSet::BlockExact, &mut |key| {
            filter.insert(key);
        })?;

        Ok(filter)
    }

    fn insert(&self, key: &str) {
        let h1 = hash1(key, self.size_bits);
        let h2 = hash2(key, self.size_bits);
        for i in 0..HASHES {
            let pos = pos_for(h1, h2, i, self.size_bits);
            let byte = &self.bits[(pos / 8) as usize];
            let mask = 1u8 << (pos % 8);
            byte.fetch_or(mask, Ordering::Relaxed);
        }
    }

    /// Returns `false` only if `key` is definitely absent from
    /// `block_exact`; `true` otherwise (possibly present, ~1% false
    /// positive rate at design capacity). Lock-free: bits are only
    /// ever set during `build`, never cleared.
    pub fn might_contain(&self, key: &str) -> bool {
        if self.bits.is_empty() {
            return true;
        }
        let h1 = hash1(key, self.size_bits);
        let h2 = hash2(key, self.size_bits);
        for i in 0..HASHES {
            let pos = pos_for(h1, h2, i, self.size_bits);
            let byte = self.bits[(pos / 8) as usize].load(Ordering::Relaxed);
            if byte & (1u8 << (pos % 8)) == 0 {
                return false;
            }
        }
        true
    }

    pub fn size_bits(&self) -> u64 {
        self.size_bits
    }
}

/// `ceil(-n * ln(0.01) / ln(2)^2) ≈ 9.6*n`, clamped to `[MIN_BITS, MAX_BITS]`.
fn size_for(n: u64) -> u64 {
    let raw = (n as f64 * 9.6).ceil() as u64;
    raw.max(MIN_BITS).min(MAX_BITS).max(8) // never zero-length
}

fn pos_for(h1: u32, h2: u32, i: u32, size_bits: u64) -> u64 {
    let combined = (h1 as u64).wrapping_add((i as u64).wrapping_mul(h2 as u64));
    combined % size_bits
}

/// Multiplicative 31-hash, the cheaper of the two base hashes.
fn hash1(s: &str, size_bits: u64) -> u32 {
    let mut hash: u32 = 0;
    for b in s.bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(b as u32);
    }
    hash % (size_bits as u32).max(1)
}

/// DJB2-XOR variant, chosen to decorrelate from [`hash1`] so the two
/// probe sequences don't collide in lockstep.
fn hash2(s: &str, size_bits: u64) -> u32 {
    let mut hash: u32 = 5381;
    for b in s.bytes() {
        hash = (hash << 5).wrapping_add(hash) ^ (b as u32);
    }
    hash % (size_bits as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn inserted_keys_are_found() {
        let store = InMemoryStore::new();
        store.insert_block_exact("ads.example.com");
        store.insert_block_exact("tracker.example.com");
        let filter = NegativeFilter::build(2, &store).unwrap();
        assert!(filter.might_contain("ads.example.com"));
        assert!(filter.might_contain("tracker.example.com"));
    }

    #[test]
    fn absent_key_is_usually_rejected() {
        let store = InMemoryStore::new();
        for i in 0..1000 {
            store.insert_block_exact(format!("blocked{i}.example.com"));
        }
        let filter = NegativeFilter::build(1000, &store).unwrap();
        // "Definitely absent" must never be wrong (no false
        // negatives). We can't assert "false" for an arbitrary absent
        // key (false positives are allowed), but we can assert the
        // filter rejects *most* of a large absent batch at the
        // configured ~1% FPR.
        let false_positives = (0..1000)
            .filter(|i| filter.might_contain(&format!("notblocked{i}.example.com")))
            .count();
        assert!(false_positives < 100, "false positive rate too high: {false_positives}/1000");
    }

    #[test]
    fn size_respects_bounds() {
        assert_eq!(size_for(0).min(MIN_BITS), MIN_BITS);
        assert!(size_for(10_000_000_000) <= MAX_BITS);
    }

    #[test]
    fn empty_block_exact_rejects_everything() {
        let store = InMemoryStore::new();
        let filter = NegativeFilter::build(0, &store).unwrap();
        // Nothing was ever inserted, so every bit is still zero and
        // the filter correctly reports "definitely absent".
        assert!(!filter.might_contain("anything.com"));
    }
}
