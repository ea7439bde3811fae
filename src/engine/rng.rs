//! Deterministic random stream keyed by `(seed string, cursor)`.
//!
//! There is no generator object and no global state: every draw derives a
//! fresh `Lcg64Xsh32` from the match seed and an explicit logical cursor
//! carried in `MatchState`. Replaying from any snapshot therefore reproduces
//! the exact future stream.

use rand::{RngCore, SeedableRng};
use rand_pcg::Lcg64Xsh32;

/// Fold a string seed into a u64 accumulator.
fn fold_seed(seed: &str) -> u64 {
    let mut acc: u64 = 0x9e37_79b9_7f4a_7c15;
    for b in seed.bytes() {
        acc = acc.wrapping_mul(31).wrapping_add(u64::from(b));
    }
    acc
}

/// Build the 16-byte PCG seed from the folded string seed and the cursor.
fn seed_bytes(seed: &str, cursor: u64) -> [u8; 16] {
    let folded = fold_seed(seed);
    let mixed = folded.wrapping_mul(17).wrapping_add(cursor);
    let mut bytes = [0u8; 16];
    bytes[0..8].copy_from_slice(&folded.to_le_bytes());
    bytes[8..16].copy_from_slice(&mixed.to_le_bytes());
    bytes
}

/// Derive a value in `[0, 1)` for the given `(seed, cursor)` pair.
pub fn value(seed: &str, cursor: u64) -> f64 {
    let mut rng = Lcg64Xsh32::from_seed(seed_bytes(seed, cursor));
    // 53 significant bits, same construction as rand's f64 sampling
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// Derive an integer in `[0, bound)` for the given `(seed, cursor)` pair.
/// A zero bound yields zero.
pub fn next_int(seed: &str, cursor: u64, bound: u64) -> u64 {
    if bound == 0 {
        return 0;
    }
    let mut rng = Lcg64Xsh32::from_seed(seed_bytes(seed, cursor));
    rng.next_u64() % bound
}

/// Fisher-Yates shuffle driven by the seeded stream. Consumes one cursor
/// position per swap and returns the advanced cursor.
pub fn shuffle<T>(seed: &str, mut cursor: u64, items: &mut [T]) -> u64 {
    for i in (1..items.len()).rev() {
        let j = next_int(seed, cursor, (i + 1) as u64) as usize;
        cursor += 1;
        items.swap(i, j);
    }
    cursor
}
