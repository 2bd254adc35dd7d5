//! The analytical snapshot (spec §3): the unit of work and the unit of storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::concentration::ConcentrationMetrics;
use crate::delegation::Delegation;
use crate::holder::HolderBalance;
use crate::participation::ParticipationMetrics;
use crate::proposal::Proposal;
use crate::protocol::ProtocolId;
use crate::provenance::ProvenanceTag;
use crate::vote::Vote;
use crate::voting_block::{Anomaly, VotingBlock};

/// The full computed metric set attached to a snapshot: concentration,
/// participation, voting-block structure, and anomalies, all derived from the
/// snapshot's own holders/proposals/votes/delegations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    pub concentration: ConcentrationMetrics,
    pub participation: ParticipationMetrics,
    pub voting_blocks: Vec<VotingBlock>,
    pub anomalies: Vec<Anomaly>,
}

/// Current schema version for the on-disk snapshot record (spec §6).
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// The (protocol, timestamp)-keyed analytical bundle. Write-once: a `Snapshot`
/// is never mutated after construction; a superseded snapshot remains queryable
/// by its original key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub protocol: ProtocolId,
    pub timestamp: DateTime<Utc>,
    pub holders: Vec<HolderBalance>,
    pub proposals: Vec<Proposal>,
    pub votes: Vec<Vote>,
    pub delegations: Vec<Delegation>,
    pub metrics: Option<SnapshotMetrics>,
    pub provenance: ProvenanceTag,
}

impl Snapshot {
    pub fn new(
        protocol: ProtocolId,
        timestamp: DateTime<Utc>,
        holders: Vec<HolderBalance>,
        proposals: Vec<Proposal>,
        votes: Vec<Vote>,
        delegations: Vec<Delegation>,
        provenance: ProvenanceTag,
    ) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            protocol,
            // Spec §3: snapshot time is UTC, second precision. Truncating here
            // (rather than trusting every caller to pass a whole-second value)
            // keeps the in-memory key, the disk backend's filename, and its
            // rebuilt index in agreement — all three derive this field.
            timestamp: truncate_to_seconds(timestamp),
            holders,
            proposals,
            votes,
            delegations,
            metrics: None,
            provenance,
        }
    }

    /// The key the Snapshot Store indexes on.
    pub fn key(&self) -> (ProtocolId, DateTime<Utc>) {
        (self.protocol.clone(), self.timestamp)
    }

    pub fn with_metrics(mut self, metrics: SnapshotMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Drop sub-second precision, keeping only whole seconds (spec §3).
fn truncate_to_seconds(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.timestamp(), 0).unwrap_or(timestamp)
}
