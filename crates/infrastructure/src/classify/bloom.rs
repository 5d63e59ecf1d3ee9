use rustc_hash::FxHasher;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const HASH_COUNT: u64 = 7;

/// Bits budgeted per exact-block row. Together with seven probes this lands
/// the false-positive rate around 1%.
const BITS_PER_ROW: f64 = 9.6;

/// Sizing clamp. The lower bound keeps tiny stores from degenerating into
/// an always-hit filter; the upper bound caps the bit vector at 1 GiB for
/// stores in the billions of rows.
const MIN_BITS: u64 = 1 << 16;
const MAX_BITS: u64 = 1 << 33;

/// Membership pre-filter over the exact-block set.
///
/// Built once at init by streaming `block_exact` and immutable afterwards:
/// `insert` needs `&mut self`, so once the filter is shared behind the
/// engine no writer can exist and `check` runs without synchronization.
/// A negative `check` guarantees the domain is absent from `block_exact`
/// and lets the classifier skip the store lookup entirely.
pub struct ExactBloom {
    words: Vec<u64>,
    bits: u64,
}

impl ExactBloom {
    /// Size the filter for an expected row count, clamped per above.
    pub fn with_expected_rows(rows: u64) -> Self {
        let bits = sized_bits(rows);
        let words = vec![0u64; bits.div_ceil(64) as usize];
        Self { words, bits }
    }

    pub fn insert(&mut self, domain: &str) {
        let (h1, h2) = hash_pair(domain);
        for i in 0..HASH_COUNT {
            let bit = h1.wrapping_add(i.wrapping_mul(h2)) % self.bits;
            self.words[(bit / 64) as usize] |= 1u64 << (bit % 64);
        }
    }

    /// True iff all probe positions are set. False guarantees absence.
    #[inline]
    pub fn check(&self, domain: &str) -> bool {
        let (h1, h2) = hash_pair(domain);
        (0..HASH_COUNT).all(|i| {
            let bit = h1.wrapping_add(i.wrapping_mul(h2)) % self.bits;
            self.words[(bit / 64) as usize] & (1u64 << (bit % 64)) != 0
        })
    }

    pub fn bit_len(&self) -> u64 {
        self.bits
    }
}

fn sized_bits(rows: u64) -> u64 {
    let wanted = (rows as f64 * BITS_PER_ROW).ceil() as u64;
    wanted.clamp(MIN_BITS, MAX_BITS)
}

/// Two independent 64-bit hashes of the domain. The probe positions are
/// `(h1 + i·h2) mod m`; forcing `h2` odd keeps the stride coprime with the
/// word-aligned bit vector so the probes never collapse onto one position.
fn hash_pair(domain: &str) -> (u64, u64) {
    let mut fx = FxHasher::default();
    domain.hash(&mut fx);
    let mut sip = DefaultHasher::new();
    domain.hash(&mut sip);
    (fx.finish(), sip.finish() | 1)
}
