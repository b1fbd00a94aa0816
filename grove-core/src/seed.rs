//! Deterministic seeding from stable identifiers.
//!
//! All organic variation (direction jitter, split roll, bark noise) is
//! derived from the person's identifier so regenerating from the same
//! input reproduces the same geometry bit for bit. `std`'s hasher and
//! `StdRng` are not used: neither promises the same output across releases.
//! `ChaCha8Rng` is value-stable.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Random stream handed to growth for one person.
pub type PersonRng = ChaCha8Rng;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a hash of a string.
pub fn hash_str(s: &str) -> u64 {
    let mut h = FNV_OFFSET;
    for b in s.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Finalizer from SplitMix64; spreads nearby inputs across the full range.
#[inline]
pub fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Seed for a person, combined with a global seed.
pub fn person_seed(id: &str, seed: u64) -> u64 {
    mix(hash_str(id) ^ mix(seed))
}

/// A fresh RNG for one person. Reseeded per person, never shared.
pub fn person_rng(id: &str, seed: u64) -> PersonRng {
    PersonRng::seed_from_u64(person_seed(id, seed))
}

/// Hash-based noise in `[-1, 1]` for a lattice coordinate.
pub fn lattice_noise(seed: u64, a: u32, b: u32) -> f32 {
    let h = mix(seed ^ mix(((a as u64) << 32) | b as u64));
    // Top 24 bits give an exact f32 in [0, 1).
    let unit = (h >> 40) as f32 / (1u64 << 24) as f32;
    unit * 2.0 - 1.0
}
