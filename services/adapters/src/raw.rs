//! Wire-shape records returned by provider adapters before normalization
//! (spec §4.1, §4.3). Amounts and addresses travel as strings here because
//! that is how every one of the five sources actually serializes them over
//! JSON/GraphQL; the Normalizer is the single place that parses and rejects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawHolder {
    pub address: String,
    pub balance: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HolderPage {
    pub holders: Vec<RawHolder>,
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawProposal {
    pub proposal_id: String,
    pub proposer: String,
    pub created_at: DateTime<Utc>,
    pub voting_start: DateTime<Utc>,
    pub voting_end: DateTime<Utc>,
    pub status: String,
    pub quorum: String,
    pub for_votes: String,
    pub against_votes: String,
    pub abstain_votes: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawVote {
    pub proposal_id: String,
    pub voter: String,
    pub choice: String,
    pub power: String,
    pub cast_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawDelegation {
    pub delegator: String,
    pub delegatee: String,
    pub effective_from: DateTime<Utc>,
    /// `None` means a full delegation; `Some(amount)` is a partial one, both
    /// as base-unit decimal strings.
    pub amount: Option<String>,
}
