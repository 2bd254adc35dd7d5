//! Voting-block and anomaly results (spec §3, §4.7). Pure data: discovery and
//! detection algorithms live in the `graph` crate.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::vote::ProposalRef;

/// A set of voters whose pairwise agreement on co-voted proposals exceeds the
/// configured threshold. Derived from a snapshot; not independently persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VotingBlock {
    /// Ascending by address, so block identity is stable under relabeling.
    pub members: Vec<Address>,
    pub aggregate_power: u128,
    pub cohesion: f64,
    pub influence: f64,
}

impl VotingBlock {
    /// The smallest member address, used as the tie-break key when sorting
    /// blocks of equal aggregate power (spec §4.7).
    pub fn min_address(&self) -> Option<Address> {
        self.members.iter().copied().min()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyCategory {
    CoordinatedVoting,
    WhaleVsOutcome,
    PowerVsOutcomeDivergence,
    ParticipationSpike,
}

/// What an anomaly is about: a specific proposal, or a voting block's index
/// into the snapshot's block list. Exactly one of the two is set, matching
/// which category produced the anomaly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReference {
    pub proposal: Option<ProposalRef>,
    pub block_index: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub category: AnomalyCategory,
    pub reference: AnomalyReference,
    /// Higher is more severe. Comparable within a category; cross-category
    /// comparison is for sorting only, not semantic equivalence.
    pub severity: f64,
}
