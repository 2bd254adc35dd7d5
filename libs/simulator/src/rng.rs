//! Shared deterministic RNG helpers. Every generator in this crate seeds a
//! fresh `ChaCha8Rng` from the caller's seed, so the same seed and parameters
//! always reproduce the same output regardless of call order (spec §8,
//! invariant 8: bit-identical output for identical seed and parameters).

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use types::Address;

pub fn rng_from_seed(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

pub fn random_address(rng: &mut ChaCha8Rng) -> Address {
    let mut bytes = [0u8; 20];
    rng.fill_bytes(&mut bytes);
    Address(bytes)
}

/// Standard normal sample via the Box-Muller transform.
pub fn sample_standard_normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Poisson sample via Knuth's algorithm. Adequate for the proposal-count
/// rates this crate deals with (lambda in the tens at most).
pub fn sample_poisson(rng: &mut ChaCha8Rng, lambda: f64) -> u64 {
    if lambda <= 0.0 {
        return 0;
    }
    let l = (-lambda).exp();
    let mut k = 0u64;
    let mut p = 1.0;
    loop {
        k += 1;
        p *= rng.gen_range(0.0..1.0);
        if p <= l {
            return k - 1;
        }
    }
}
