//! Governance proposals (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::GovError;
use crate::protocol::ProtocolId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Active,
    Succeeded,
    Defeated,
    Executed,
    Cancelled,
    Expired,
}

impl ProposalStatus {
    /// A status a proposal can never transition out of.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Succeeded
                | ProposalStatus::Defeated
                | ProposalStatus::Executed
                | ProposalStatus::Cancelled
                | ProposalStatus::Expired
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tallies {
    pub for_: u128,
    pub against: u128,
    pub abstain: u128,
}

impl Tallies {
    pub const ZERO: Tallies = Tallies {
        for_: 0,
        against: 0,
        abstain: 0,
    };

    pub fn total(&self) -> u128 {
        self.for_ + self.against + self.abstain
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub protocol: ProtocolId,
    pub proposal_id: String,
    pub proposer: Address,
    pub created_at: DateTime<Utc>,
    pub voting_start: DateTime<Utc>,
    pub voting_end: DateTime<Utc>,
    pub status: ProposalStatus,
    pub quorum: u128,
    pub tallies: Tallies,
    pub metadata: Option<serde_json::Value>,
}

impl Proposal {
    /// Validate the structural invariants spec §3 requires of a single record:
    /// start ≤ end. (The "tallies never decrease" and "terminal status never
    /// reverts" invariants are properties of an update *sequence*; see
    /// [`Proposal::validate_transition`].)
    pub fn validate(&self) -> Result<(), GovError> {
        if self.voting_start > self.voting_end {
            return Err(GovError::Validation(format!(
                "proposal {} has voting_start after voting_end",
                self.proposal_id
            )));
        }
        Ok(())
    }

    /// Validate that `next` is a legal update of `self` as votes stream in:
    /// tallies must not decrease, and a terminal status must never revert to a
    /// non-terminal (or different terminal) one.
    pub fn validate_transition(&self, next: &Proposal) -> Result<(), GovError> {
        next.validate()?;
        if next.tallies.for_ < self.tallies.for_
            || next.tallies.against < self.tallies.against
            || next.tallies.abstain < self.tallies.abstain
        {
            return Err(GovError::Validation(format!(
                "proposal {} tallies decreased on update",
                self.proposal_id
            )));
        }
        if self.status.is_terminal() && next.status != self.status {
            return Err(GovError::Validation(format!(
                "proposal {} terminal status {:?} reverted to {:?}",
                self.proposal_id, self.status, next.status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn proposal(start_offset: i64, end_offset: i64, status: ProposalStatus) -> Proposal {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Proposal {
            protocol: ProtocolId::new("lending-a"),
            proposal_id: "1".into(),
            proposer: Address::ZERO,
            created_at: base,
            voting_start: base + chrono::Duration::seconds(start_offset),
            voting_end: base + chrono::Duration::seconds(end_offset),
            status,
            quorum: 100,
            tallies: Tallies::ZERO,
            metadata: None,
        }
    }

    #[test]
    fn rejects_end_before_start() {
        let p = proposal(10, 5, ProposalStatus::Pending);
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_decreasing_tallies() {
        let mut a = proposal(0, 100, ProposalStatus::Active);
        a.tallies = Tallies {
            for_: 10,
            against: 0,
            abstain: 0,
        };
        let mut b = a.clone();
        b.tallies.for_ = 5;
        assert!(a.validate_transition(&b).is_err());
    }

    #[test]
    fn rejects_terminal_status_reverting() {
        let a = proposal(0, 100, ProposalStatus::Succeeded);
        let b = proposal(0, 100, ProposalStatus::Active);
        assert!(a.validate_transition(&b).is_err());
    }

    #[test]
    fn accepts_monotonic_update() {
        let mut a = proposal(0, 100, ProposalStatus::Active);
        a.tallies.for_ = 10;
        let mut b = a.clone();
        b.tallies.for_ = 20;
        b.status = ProposalStatus::Succeeded;
        assert!(a.validate_transition(&b).is_ok());
    }
}
