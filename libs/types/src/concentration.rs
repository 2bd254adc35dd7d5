//! Concentration metric results (spec §4.5). Pure data: the computations that
//! produce these values live in the `metrics` crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationMetrics {
    pub gini: f64,
    /// Herfindahl-Hirschman index, scaled by 10,000 (so the range is [0, 10000]).
    pub hhi: f64,
    /// Smallest number of top holders whose combined balance exceeds half of
    /// total supply. `None` only when the holder set is empty.
    pub nakamoto: Option<u64>,
    /// Top-10% share divided by bottom-40% share. `None` when the bottom 40%
    /// share is zero (undefined ratio).
    pub palma: Option<f64>,
    /// Top-N share for each configured N (spec default: {5, 10, 20, 50}).
    pub top_n_shares: BTreeMap<u32, f64>,
    /// Sampled (population share, wealth share) points along the Lorenz curve,
    /// in ascending population-share order.
    pub lorenz_points: Vec<(f64, f64)>,
    /// Set when the input was degenerate (empty holder set, or zero total
    /// supply) and the other fields are defined sentinels rather than computed
    /// values.
    pub degenerate: bool,
}

impl ConcentrationMetrics {
    /// The sentinel result for an empty or zero-total holder set (spec §4.5,
    /// §8 boundary behavior).
    pub fn degenerate_sentinel() -> Self {
        Self {
            gini: 0.0,
            hhi: 0.0,
            nakamoto: None,
            palma: None,
            top_n_shares: BTreeMap::new(),
            lorenz_points: Vec::new(),
            degenerate: true,
        }
    }
}
