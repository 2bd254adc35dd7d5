//! Inequality and concentration measures (spec §4.5).
//!
//! All functions treat balances as an empirical distribution. Degenerate inputs
//! (empty set, zero total) return the sentinel values §4.5/§8 define, never a
//! panic.

use std::collections::BTreeMap;

use types::ConcentrationMetrics;

/// Holder counts must be at least this large for the top-10%/bottom-40%
/// population split used by [`palma`] to be meaningful; below it, a decile
/// split of the population doesn't land on whole holders and the ratio is
/// treated as undefined. See `DESIGN.md` for why this threshold was chosen
/// over interpolating the Lorenz curve.
const PALMA_MIN_HOLDERS: usize = 10;

/// The top-N holder counts spec §4.5 names by default.
pub const DEFAULT_TOP_N: [u32; 4] = [5, 10, 20, 50];

/// Resolution (number of sample points) for [`lorenz_points`].
pub const LORENZ_RESOLUTION: usize = 20;

/// Compute the full concentration metric set for a set of holder balances.
///
/// `balances` need not be pre-sorted; this function sorts internally.
pub fn compute_concentration(balances: &[u128]) -> ConcentrationMetrics {
    let total: u128 = balances.iter().sum();
    if balances.is_empty() || total == 0 {
        return ConcentrationMetrics::degenerate_sentinel();
    }

    let mut ascending = balances.to_vec();
    ascending.sort_unstable();

    ConcentrationMetrics {
        gini: gini(&ascending, total),
        hhi: hhi(&ascending, total),
        nakamoto: nakamoto(&ascending),
        palma: palma(&ascending, total),
        top_n_shares: top_n_shares(&ascending, total, &DEFAULT_TOP_N),
        lorenz_points: lorenz_points(&ascending, total, LORENZ_RESOLUTION),
        degenerate: false,
    }
}

/// Gini coefficient: `(2 * Σ i·b_i) / (n·T) - (n+1)/n` with `b` sorted
/// ascending, 1-indexed. Returns 0 when `n <= 1` or `T == 0` (spec §4.5, §8
/// invariant 4: always in `[0, 1]`).
pub fn gini(ascending: &[u128], total: u128) -> f64 {
    let n = ascending.len();
    if n <= 1 || total == 0 {
        return 0.0;
    }
    let n_f = n as f64;
    let total_f = total as f64;
    let weighted: f64 = ascending
        .iter()
        .enumerate()
        .map(|(idx, &b)| (idx + 1) as f64 * b as f64)
        .sum();
    (2.0 * weighted) / (n_f * total_f) - (n_f + 1.0) / n_f
}

/// Herfindahl-Hirschman index, scaled by 10,000 (spec §4.5, §8 invariant 5:
/// always in `[0, 10000]`).
pub fn hhi(balances: &[u128], total: u128) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total_f = total as f64;
    let sum_sq: f64 = balances
        .iter()
        .map(|&b| {
            let share = b as f64 / total_f;
            share * share
        })
        .sum();
    sum_sq * 10_000.0
}

/// Smallest `k` such that the top-`k` holders' combined balance exceeds half of
/// total supply. `balances` must be sorted ascending; this function reads it
/// from the tail. `None` only for an empty set (spec §8 invariant 6: `>= 1`
/// whenever total balance is positive).
pub fn nakamoto(ascending: &[u128]) -> Option<u64> {
    if ascending.is_empty() {
        return None;
    }
    let total: u128 = ascending.iter().sum();
    if total == 0 {
        return None;
    }
    let mut cumulative: u128 = 0;
    for (rank, &b) in ascending.iter().rev().enumerate() {
        cumulative += b;
        // compare 2*cumulative > total rather than cumulative > total/2, to
        // avoid integer-division rounding on odd totals.
        if 2 * cumulative > total {
            return Some((rank + 1) as u64);
        }
    }
    Some(ascending.len() as u64)
}

/// Top-10% population wealth share divided by bottom-40% population wealth
/// share. `None` when the population is too small to split into whole-holder
/// deciles ([`PALMA_MIN_HOLDERS`]) or when the resulting bottom-40% share is
/// exactly zero.
pub fn palma(ascending: &[u128], total: u128) -> Option<f64> {
    let n = ascending.len();
    if n < PALMA_MIN_HOLDERS || total == 0 {
        return None;
    }
    let total_f = total as f64;
    let bottom_count = ((n as f64) * 0.4).floor() as usize;
    let top_count = ((n as f64) * 0.1).floor() as usize;
    if bottom_count == 0 || top_count == 0 {
        return None;
    }
    let bottom_sum: u128 = ascending[..bottom_count].iter().sum();
    let top_sum: u128 = ascending[n - top_count..].iter().sum();
    let bottom_share = bottom_sum as f64 / total_f;
    if bottom_share == 0.0 {
        return None;
    }
    let top_share = top_sum as f64 / total_f;
    Some(top_share / bottom_share)
}

/// Share of total held by the top `n` holders, for each requested `n`.
/// `n` values larger than the holder count use the whole set.
pub fn top_n_shares(ascending: &[u128], total: u128, ns: &[u32]) -> BTreeMap<u32, f64> {
    if total == 0 {
        return ns.iter().map(|&n| (n, 0.0)).collect();
    }
    let total_f = total as f64;
    let len = ascending.len();
    ns.iter()
        .map(|&n| {
            let count = (n as usize).min(len);
            let sum: u128 = ascending[len - count..].iter().sum();
            (n, sum as f64 / total_f)
        })
        .collect()
}

/// Sampled `(population share, wealth share)` points along the Lorenz curve, at
/// `resolution` evenly spaced population fractions plus the curve's endpoints.
pub fn lorenz_points(ascending: &[u128], total: u128, resolution: usize) -> Vec<(f64, f64)> {
    let n = ascending.len();
    if n == 0 || total == 0 || resolution == 0 {
        return Vec::new();
    }
    let total_f = total as f64;
    let mut cumulative = vec![0u128; n + 1];
    for i in 0..n {
        cumulative[i + 1] = cumulative[i] + ascending[i];
    }

    (0..=resolution)
        .map(|step| {
            let pop_share = step as f64 / resolution as f64;
            let idx = ((pop_share * n as f64).round() as usize).min(n);
            (pop_share, cumulative[idx] as f64 / total_f)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_returns_sentinel() {
        let m = compute_concentration(&[]);
        assert!(m.degenerate);
        assert_eq!(m.gini, 0.0);
        assert_eq!(m.hhi, 0.0);
        assert_eq!(m.nakamoto, None);
    }

    #[test]
    fn zero_total_returns_sentinel() {
        let m = compute_concentration(&[0, 0, 0]);
        assert!(m.degenerate);
    }

    #[test]
    fn single_holder_is_maximally_concentrated() {
        let m = compute_concentration(&[500]);
        assert_eq!(m.gini, 0.0); // n<=1 sentinel per spec §8 boundary behavior
        assert_eq!(m.hhi, 10_000.0);
        assert_eq!(m.nakamoto, Some(1));
        assert_eq!(m.palma, None); // too few holders for a decile split
    }

    #[test]
    fn scenario_one_nakamoto_and_top5_share_match_spec() {
        // spec §8 scenario 1: balances [100, 50, 30, 20], total 200.
        let m = compute_concentration(&[100, 50, 30, 20]);
        assert_eq!(m.nakamoto, Some(2));
        assert_eq!(m.top_n_shares.get(&5), Some(&1.0));
        assert_eq!(m.palma, None); // n=4 < PALMA_MIN_HOLDERS
    }

    #[test]
    fn gini_is_correct_for_a_hand_verified_distribution() {
        // Verified independently via the Lorenz-curve-area method and the
        // pairwise-mean-absolute-difference method; both agree on 0.325.
        let g = gini(&[20, 30, 50, 100], 200);
        assert!((g - 0.325).abs() < 1e-9);
    }

    #[test]
    fn hhi_is_correct_for_a_hand_verified_distribution() {
        let h = hhi(&[20, 30, 50, 100], 200);
        assert!((h - 3450.0).abs() < 1e-9);
    }

    #[test]
    fn gini_and_hhi_stay_in_bounds() {
        let m = compute_concentration(&[1, 2, 5, 10, 20, 30, 50, 100]);
        assert!(m.gini >= 0.0 && m.gini <= 1.0);
        assert!(m.hhi >= 0.0 && m.hhi <= 10_000.0);
    }

    #[test]
    fn lorenz_endpoints_are_zero_and_one() {
        let points = lorenz_points(&[10, 20, 30], 60, 10);
        assert_eq!(points.first(), Some(&(0.0, 0.0)));
        assert_eq!(points.last(), Some(&(1.0, 1.0)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn gini_always_in_unit_interval(balances in proptest::collection::vec(0u128..1_000_000, 0..50)) {
            let m = compute_concentration(&balances);
            prop_assert!(m.gini >= 0.0 && m.gini <= 1.0 + 1e-9);
        }

        #[test]
        fn hhi_always_in_spec_range(balances in proptest::collection::vec(0u128..1_000_000, 0..50)) {
            let m = compute_concentration(&balances);
            prop_assert!(m.hhi >= 0.0 && m.hhi <= 10_000.0 + 1e-6);
        }

        #[test]
        fn nakamoto_at_least_one_when_positive_total(balances in proptest::collection::vec(1u128..1_000_000, 1..50)) {
            let m = compute_concentration(&balances);
            prop_assert!(m.nakamoto.unwrap() >= 1);
        }
    }
}
