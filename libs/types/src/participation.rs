//! Participation metric results (spec §4.6). Pure data: the computations live in
//! the `metrics` crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::vote::ProposalRef;

/// Per-bucket participation within a holding-size segmentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HolderBucket {
    /// Inclusive lower bound of the bucket, in base units.
    pub floor: u128,
    /// Exclusive upper bound, or `None` for the open-ended top bucket.
    pub ceiling: Option<u128>,
    pub voter_count: u64,
    pub participation_rate: f64,
    pub cast_power_share: f64,
}

/// Top-K holder agreement-with-outcome and influence summary (spec §4.6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhaleBehavior {
    pub top_k: u32,
    /// Fraction of proposals (among those the top-K holders voted on) where
    /// their vote matched the winning choice.
    pub outcome_agreement_rate: f64,
    /// Aggregate share of winning-side power contributed by the top-K holders,
    /// averaged over proposals they participated in.
    pub aggregate_influence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticipationMetrics {
    /// Power-weighted turnout per proposal: cast power / eligible power.
    pub turnout_by_proposal: BTreeMap<ProposalRef, f64>,
    /// Power-weighted mean of per-proposal turnout (the authoritative
    /// participation figure — spec §9 open question resolution).
    pub overall_turnout: f64,
    /// Distinct-voter count across all proposals, reported separately from
    /// `overall_turnout` per spec §9's open-question resolution.
    pub distinct_voter_count: u64,
    pub segmentation: Vec<HolderBucket>,
    pub whale_behavior: WhaleBehavior,
}
