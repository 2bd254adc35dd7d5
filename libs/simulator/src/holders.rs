//! Synthetic holder distribution profiles (spec §4.4).

use rand::Rng;
use types::{rank_holders, Address, HolderBalance};

use crate::rng::{random_address, rng_from_seed, sample_standard_normal};

/// Floor each `scale * i^-alpha` term (1-indexed) and rescale so the sum never
/// exceeds `supply`. `n` random addresses are assigned the resulting balances.
pub fn power_law(n: usize, alpha: f64, supply: u128, seed: u64) -> Vec<HolderBalance> {
    if n == 0 || supply == 0 {
        return Vec::new();
    }
    let raw: Vec<f64> = (1..=n).map(|i| (i as f64).powf(-alpha)).collect();
    let raw_sum: f64 = raw.iter().sum();
    let scale = supply as f64 / raw_sum;
    let balances: Vec<u128> = raw.iter().map(|&r| (r * scale).floor() as u128).collect();
    assign_addresses(balances, seed)
}

/// One to three addresses hold `dominant_share` of supply (default >= 0.6);
/// the remainder is distributed power-law among the rest.
pub fn protocol_dominated(n: usize, alpha: f64, dominant_share: f64, supply: u128, seed: u64) -> Vec<HolderBalance> {
    if n == 0 || supply == 0 {
        return Vec::new();
    }
    let mut rng = rng_from_seed(seed);
    let dominant_count = rng.gen_range(1..=3usize).min(n);
    let dominant_total = ((supply as f64) * dominant_share).round() as u128;
    let remainder_holders = n - dominant_count;
    let remainder_supply = supply.saturating_sub(dominant_total);

    let mut balances = Vec::with_capacity(n);
    // Split the dominant share roughly evenly across the dominant holders,
    // with the remainder from integer division folded into the first.
    let share = dominant_total / dominant_count as u128;
    let leftover = dominant_total - share * dominant_count as u128;
    for i in 0..dominant_count {
        balances.push(if i == 0 { share + leftover } else { share });
    }

    if remainder_holders > 0 {
        let raw: Vec<f64> = (1..=remainder_holders).map(|i| (i as f64).powf(-alpha)).collect();
        let raw_sum: f64 = raw.iter().sum();
        let scale = remainder_supply as f64 / raw_sum;
        balances.extend(raw.iter().map(|&r| (r * scale).floor() as u128));
    }

    assign_addresses(balances, seed)
}

/// Log-normal balances with small variance, yielding low concentration.
/// `seed` both drives the RNG and is folded into the address stream.
pub fn community(n: usize, supply: u128, seed: u64) -> Vec<HolderBalance> {
    if n == 0 || supply == 0 {
        return Vec::new();
    }
    const SIGMA: f64 = 0.25;
    let mut rng = rng_from_seed(seed);
    let mu = 0.0;
    let raw: Vec<f64> = (0..n)
        .map(|_| (mu + SIGMA * sample_standard_normal(&mut rng)).exp())
        .collect();
    let raw_sum: f64 = raw.iter().sum();
    let scale = supply as f64 / raw_sum;
    let balances: Vec<u128> = raw.iter().map(|&r| (r * scale).floor() as u128).collect();
    assign_addresses(balances, seed)
}

fn assign_addresses(balances: Vec<u128>, seed: u64) -> Vec<HolderBalance> {
    let mut rng = rng_from_seed(seed.wrapping_add(1));
    let pairs: Vec<(Address, u128)> = balances
        .into_iter()
        .map(|b| (random_address(&mut rng), b))
        .collect();
    rank_holders(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_law_sum_never_exceeds_supply() {
        let holders = power_law(50, 1.16, 1_000_000, 42);
        let total: u128 = holders.iter().map(|h| h.balance).sum();
        assert!(total <= 1_000_000);
    }

    #[test]
    fn power_law_is_deterministic_for_a_fixed_seed() {
        let a = power_law(20, 1.16, 500_000, 7);
        let b = power_law(20, 1.16, 500_000, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn protocol_dominated_concentrates_majority_in_top_holders() {
        let holders = protocol_dominated(30, 1.16, 0.6, 1_000_000, 11);
        let total: u128 = holders.iter().map(|h| h.balance).sum();
        let top3: u128 = holders.iter().take(3).map(|h| h.balance).sum();
        assert!(top3 as f64 / total as f64 >= 0.55);
    }

    #[test]
    fn community_profile_is_comparatively_flat() {
        let holders = community(50, 1_000_000, 5);
        let total: u128 = holders.iter().map(|h| h.balance).sum();
        let top1_share = holders[0].balance as f64 / total as f64;
        assert!(top1_share < 0.2);
    }
}
