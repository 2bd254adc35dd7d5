//! Individual votes (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::protocol::ProtocolId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    For,
    Against,
    Abstain,
}

/// A protocol-unique reference to a proposal, used to key votes without an
/// owning handle back to the `Proposal` itself (spec §3 Ownership: cross-snapshot
/// references use keys, not shared handles).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalRef {
    pub protocol: ProtocolId,
    pub proposal_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub proposal: ProposalRef,
    pub voter: Address,
    pub choice: Choice,
    /// Voting power at vote time: a snapshot of holdings + delegated-in at the
    /// proposal's voting-power reference block.
    pub power: u128,
    pub cast_at: DateTime<Utc>,
}
