//! Maps raw adapter records onto the canonical data model, dropping any
//! record that violates schema and tracking whether enough of the batch
//! survived to trust the fetch (spec §4.3).

use types::{
    Address, Choice, Delegation, DelegationAmount, Proposal, ProposalRef, ProposalStatus,
    ProtocolId, Tallies, Vote,
};

use crate::raw::{RawDelegation, RawProposal, RawVote};

/// The minimum fraction of a batch that must survive normalization for the
/// fetch to be treated as successful for that data kind (spec §4.3). Below
/// this, the Coordinator proceeds to the next fallback.
pub const MIN_SURVIVOR_SHARE: f64 = 0.8;

/// The outcome of normalizing one batch of raw records of a single kind.
pub struct NormalizedBatch<T> {
    pub records: Vec<T>,
    pub expected: usize,
    pub dropped: usize,
}

impl<T> NormalizedBatch<T> {
    pub fn survivor_share(&self) -> f64 {
        if self.expected == 0 {
            1.0
        } else {
            self.records.len() as f64 / self.expected as f64
        }
    }

    pub fn meets_minimum(&self) -> bool {
        self.survivor_share() >= MIN_SURVIVOR_SHARE
    }
}

fn parse_address(raw: &str, field: &str, drop_reason: &mut Option<String>) -> Option<Address> {
    match raw.parse::<Address>() {
        Ok(a) => Some(a),
        Err(e) => {
            *drop_reason = Some(format!("invalid {field} '{raw}': {e}"));
            None
        }
    }
}

fn parse_amount(raw: &str, field: &str, drop_reason: &mut Option<String>) -> Option<u128> {
    match raw.parse::<u128>() {
        Ok(v) => Some(v),
        Err(e) => {
            *drop_reason = Some(format!("invalid {field} '{raw}': {e}"));
            None
        }
    }
}

pub fn normalize_holders(raw: Vec<crate::raw::RawHolder>) -> NormalizedBatch<(Address, u128)> {
    let expected = raw.len();
    let mut records = Vec::with_capacity(expected);
    for entry in raw {
        let mut reason = None;
        let address = parse_address(&entry.address, "holder address", &mut reason);
        let balance = parse_amount(&entry.balance, "holder balance", &mut reason);
        match (address, balance) {
            (Some(a), Some(b)) => records.push((a, b)),
            _ => {
                tracing::warn!(
                    address = %entry.address,
                    balance = %entry.balance,
                    reason = reason.as_deref().unwrap_or("unknown"),
                    "dropped holder record during normalization"
                );
            }
        }
    }
    let dropped = expected - records.len();
    NormalizedBatch { records, expected, dropped }
}

fn parse_status(raw: &str) -> Option<ProposalStatus> {
    match raw.to_ascii_lowercase().as_str() {
        "pending" => Some(ProposalStatus::Pending),
        "active" => Some(ProposalStatus::Active),
        "succeeded" => Some(ProposalStatus::Succeeded),
        "defeated" => Some(ProposalStatus::Defeated),
        "executed" => Some(ProposalStatus::Executed),
        "cancelled" | "canceled" => Some(ProposalStatus::Cancelled),
        "expired" => Some(ProposalStatus::Expired),
        _ => None,
    }
}

pub fn normalize_proposals(protocol: &ProtocolId, raw: Vec<RawProposal>) -> NormalizedBatch<Proposal> {
    let expected = raw.len();
    let mut records = Vec::with_capacity(expected);
    for entry in raw {
        let mut reason = None;
        let proposer = parse_address(&entry.proposer, "proposer", &mut reason);
        let quorum = parse_amount(&entry.quorum, "quorum", &mut reason);
        let for_ = parse_amount(&entry.for_votes, "for_votes", &mut reason);
        let against = parse_amount(&entry.against_votes, "against_votes", &mut reason);
        let abstain = parse_amount(&entry.abstain_votes, "abstain_votes", &mut reason);
        let status = parse_status(&entry.status).or_else(|| {
            reason = Some(format!("unknown proposal status '{}'", entry.status));
            None
        });

        let proposal = match (proposer, quorum, for_, against, abstain, status) {
            (Some(proposer), Some(quorum), Some(for_), Some(against), Some(abstain), Some(status)) => {
                Some(Proposal {
                    protocol: protocol.clone(),
                    proposal_id: entry.proposal_id.clone(),
                    proposer,
                    created_at: entry.created_at,
                    voting_start: entry.voting_start,
                    voting_end: entry.voting_end,
                    status,
                    quorum,
                    tallies: Tallies {
                        for_,
                        against,
                        abstain,
                    },
                    metadata: entry.metadata.clone(),
                })
            }
            _ => None,
        };

        match proposal.filter(|p| p.validate().is_ok()) {
            Some(p) => records.push(p),
            None => {
                tracing::warn!(
                    proposal_id = %entry.proposal_id,
                    reason = reason.as_deref().unwrap_or("start after end"),
                    "dropped proposal record during normalization"
                );
            }
        }
    }
    let dropped = expected - records.len();
    NormalizedBatch { records, expected, dropped }
}

fn parse_choice(raw: &str) -> Option<Choice> {
    match raw.to_ascii_lowercase().as_str() {
        "for" => Some(Choice::For),
        "against" => Some(Choice::Against),
        "abstain" => Some(Choice::Abstain),
        _ => None,
    }
}

pub fn normalize_votes(protocol: &ProtocolId, raw: Vec<RawVote>) -> NormalizedBatch<Vote> {
    let expected = raw.len();
    let mut records = Vec::with_capacity(expected);
    for entry in raw {
        let mut reason = None;
        let voter = parse_address(&entry.voter, "voter", &mut reason);
        let power = parse_amount(&entry.power, "power", &mut reason);
        let choice = parse_choice(&entry.choice).or_else(|| {
            reason = Some(format!("unknown vote choice '{}'", entry.choice));
            None
        });

        match (voter, power, choice) {
            (Some(voter), Some(power), Some(choice)) => records.push(Vote {
                proposal: ProposalRef {
                    protocol: protocol.clone(),
                    proposal_id: entry.proposal_id.clone(),
                },
                voter,
                choice,
                power,
                cast_at: entry.cast_at,
            }),
            _ => {
                tracing::warn!(
                    proposal_id = %entry.proposal_id,
                    voter = %entry.voter,
                    reason = reason.as_deref().unwrap_or("unknown"),
                    "dropped vote record during normalization"
                );
            }
        }
    }
    let dropped = expected - records.len();
    NormalizedBatch { records, expected, dropped }
}

/// Drop later votes that duplicate an earlier `(proposal, voter)` pair,
/// keeping the earliest cast (spec §3 invariant: at most one vote per
/// proposal per voter). Adapter output can contain duplicates across paged
/// responses; this is applied after per-record validation.
pub fn dedupe_votes(mut votes: Vec<Vote>) -> Vec<Vote> {
    votes.sort_by(|a, b| a.cast_at.cmp(&b.cast_at));
    let mut seen = std::collections::HashSet::new();
    votes.retain(|v| seen.insert((v.proposal.clone(), v.voter)));
    votes
}

pub fn normalize_delegations(raw: Vec<RawDelegation>) -> NormalizedBatch<Delegation> {
    let expected = raw.len();
    let mut records = Vec::with_capacity(expected);
    for entry in raw {
        let mut reason = None;
        let delegator = parse_address(&entry.delegator, "delegator", &mut reason);
        let delegatee = parse_address(&entry.delegatee, "delegatee", &mut reason);
        let amount = match &entry.amount {
            None => Some(DelegationAmount::Full),
            Some(raw_amount) => parse_amount(raw_amount, "delegation amount", &mut reason)
                .map(DelegationAmount::Partial),
        };

        match (delegator, delegatee, amount) {
            (Some(delegator), Some(delegatee), Some(amount)) if delegator != delegatee => {
                records.push(Delegation {
                    delegator,
                    delegatee,
                    effective_from: entry.effective_from,
                    amount,
                });
            }
            (Some(a), Some(b), _) if a == b => {
                tracing::warn!(delegator = %entry.delegator, "dropped self-loop delegation record");
            }
            _ => {
                tracing::warn!(
                    delegator = %entry.delegator,
                    reason = reason.as_deref().unwrap_or("unknown"),
                    "dropped delegation record during normalization"
                );
            }
        }
    }
    let dropped = expected - records.len();
    NormalizedBatch { records, expected, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawHolder;
    use chrono::Utc;

    #[test]
    fn drops_holder_with_unparseable_balance() {
        let raw = vec![
            RawHolder {
                address: "0x0000000000000000000000000000000000000001".to_string(),
                balance: "100".to_string(),
            },
            RawHolder {
                address: "0x0000000000000000000000000000000000000002".to_string(),
                balance: "not-a-number".to_string(),
            },
        ];
        let batch = normalize_holders(raw);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.dropped, 1);
        assert!((batch.survivor_share() - 0.5).abs() < f64::EPSILON);
        assert!(!batch.meets_minimum());
    }

    #[test]
    fn empty_batch_is_treated_as_fully_survived() {
        let batch = normalize_holders(Vec::new());
        assert!(batch.meets_minimum());
    }

    #[test]
    fn drops_proposal_with_unknown_status() {
        let now = Utc::now();
        let raw = vec![RawProposal {
            proposal_id: "1".to_string(),
            proposer: "0x0000000000000000000000000000000000000001".to_string(),
            created_at: now,
            voting_start: now,
            voting_end: now,
            status: "not-a-status".to_string(),
            quorum: "100".to_string(),
            for_votes: "10".to_string(),
            against_votes: "0".to_string(),
            abstain_votes: "0".to_string(),
            metadata: None,
        }];
        let batch = normalize_proposals(&ProtocolId::new("lending-a"), raw);
        assert!(batch.records.is_empty());
        assert_eq!(batch.dropped, 1);
    }

    #[test]
    fn dedupe_keeps_the_earliest_vote_per_voter() {
        let proposal = ProposalRef {
            protocol: ProtocolId::new("lending-a"),
            proposal_id: "1".to_string(),
        };
        let voter = Address([1; 20]);
        let early = Vote {
            proposal: proposal.clone(),
            voter,
            choice: Choice::For,
            power: 10,
            cast_at: Utc::now(),
        };
        let mut late = early.clone();
        late.cast_at = early.cast_at + chrono::Duration::seconds(1);
        late.choice = Choice::Against;

        let deduped = dedupe_votes(vec![late, early.clone()]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].choice, Choice::For);
    }

    #[test]
    fn self_loop_delegation_is_dropped() {
        let addr = "0x0000000000000000000000000000000000000001".to_string();
        let raw = vec![RawDelegation {
            delegator: addr.clone(),
            delegatee: addr,
            effective_from: Utc::now(),
            amount: None,
        }];
        let batch = normalize_delegations(raw);
        assert!(batch.records.is_empty());
    }
}
