//! Anomaly detection over a snapshot's proposals, votes, and voting blocks
//! (spec §4.7).

use std::collections::{HashMap, HashSet};

use types::{Address, Anomaly, AnomalyCategory, AnomalyReference, HolderBalance, Proposal, ProposalRef, Vote, VotingBlock};

const COORDINATED_VOTING_THRESHOLD: f64 = 0.9;
const COORDINATED_VOTING_MIN_SIZE: usize = 3;
const WHALE_LOSING_SIDE_THRESHOLD: f64 = 0.8;
const WHALE_MIN_VOTES: usize = 3;
const PARTICIPATION_SPIKE_SIGMA: f64 = 3.0;
const PARTICIPATION_SPIKE_MIN_WINDOW: usize = 3;

fn key_of(p: &Proposal) -> ProposalRef {
    ProposalRef {
        protocol: p.protocol.clone(),
        proposal_id: p.proposal_id.clone(),
    }
}

fn winning_choice(p: &Proposal) -> Option<types::Choice> {
    if p.tallies.for_ > p.tallies.against {
        Some(types::Choice::For)
    } else if p.tallies.against > p.tallies.for_ {
        Some(types::Choice::Against)
    } else {
        None
    }
}

/// Block of size >= 3 voting identically on >= 90% of its members' commonly
/// voted proposals.
fn coordinated_voting(blocks: &[VotingBlock], votes: &[Vote]) -> Vec<Anomaly> {
    let mut by_voter: HashMap<Address, HashMap<(String, String), types::Choice>> = HashMap::new();
    for v in votes {
        let key = (v.proposal.protocol.0.clone(), v.proposal.proposal_id.clone());
        by_voter.entry(v.voter).or_default().insert(key, v.choice);
    }

    blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.members.len() >= COORDINATED_VOTING_MIN_SIZE)
        .filter_map(|(idx, block)| {
            let mut common: Option<HashSet<(String, String)>> = None;
            for member in &block.members {
                let voted: HashSet<(String, String)> = by_voter
                    .get(member)
                    .map(|m| m.keys().cloned().collect())
                    .unwrap_or_default();
                common = Some(match common {
                    None => voted,
                    Some(acc) => acc.intersection(&voted).cloned().collect(),
                });
            }
            let common = common.unwrap_or_default();
            if common.is_empty() {
                return None;
            }
            let unanimous = common
                .iter()
                .filter(|key| {
                    let mut choices = block.members.iter().map(|m| by_voter[m][key]);
                    let first = choices.next().unwrap();
                    choices.all(|c| c == first)
                })
                .count();
            let ratio = unanimous as f64 / common.len() as f64;
            if ratio >= COORDINATED_VOTING_THRESHOLD {
                Some(Anomaly {
                    category: AnomalyCategory::CoordinatedVoting,
                    reference: AnomalyReference {
                        proposal: None,
                        block_index: Some(idx),
                    },
                    severity: ratio,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Top-K holders whose votes land on the losing side >= 80% of the time,
/// flagged at each proposal where that holds.
fn whale_vs_outcome(
    holders: &[HolderBalance],
    proposals: &[Proposal],
    votes: &[Vote],
    top_k: u32,
) -> Vec<Anomaly> {
    let mut sorted = holders.to_vec();
    sorted.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.address.cmp(&b.address)));
    let whales: HashSet<Address> = sorted.iter().take(top_k as usize).map(|h| h.address).collect();
    if whales.is_empty() {
        return Vec::new();
    }

    let proposals_by_ref: HashMap<ProposalRef, &Proposal> =
        proposals.iter().map(|p| (key_of(p), p)).collect();

    let mut losing_votes: HashMap<Address, Vec<ProposalRef>> = HashMap::new();
    let mut total_votes: HashMap<Address, usize> = HashMap::new();

    for v in votes.iter().filter(|v| whales.contains(&v.voter)) {
        let Some(&proposal) = proposals_by_ref.get(&v.proposal) else {
            continue;
        };
        let Some(winner) = winning_choice(proposal) else {
            continue;
        };
        *total_votes.entry(v.voter).or_insert(0) += 1;
        if v.choice != winner {
            losing_votes.entry(v.voter).or_default().push(v.proposal.clone());
        }
    }

    let mut out = Vec::new();
    for (whale, total) in &total_votes {
        if *total < WHALE_MIN_VOTES {
            continue;
        }
        let losing = losing_votes.get(whale).map(|v| v.len()).unwrap_or(0);
        let rate = losing as f64 / *total as f64;
        if rate >= WHALE_LOSING_SIDE_THRESHOLD {
            for proposal_ref in losing_votes.get(whale).into_iter().flatten() {
                out.push(Anomaly {
                    category: AnomalyCategory::WhaleVsOutcome,
                    reference: AnomalyReference {
                        proposal: Some(proposal_ref.clone()),
                        block_index: None,
                    },
                    severity: rate,
                });
            }
        }
    }
    out
}

/// A proposal's recorded status contradicts the side with more cast power,
/// typically because quorum was not met.
fn power_vs_outcome_divergence(proposals: &[Proposal]) -> Vec<Anomaly> {
    proposals
        .iter()
        .filter_map(|p| {
            let total = p.tallies.total();
            if total == 0 {
                return None;
            }
            let power_favors_for = p.tallies.for_ > p.tallies.against;
            let outcome_is_success = matches!(
                p.status,
                types::ProposalStatus::Succeeded | types::ProposalStatus::Executed
            );
            let outcome_is_failure = matches!(
                p.status,
                types::ProposalStatus::Defeated | types::ProposalStatus::Expired
            );
            let diverges = (power_favors_for && outcome_is_failure) || (!power_favors_for && outcome_is_success);
            if !diverges {
                return None;
            }
            let diff = p.tallies.for_.abs_diff(p.tallies.against);
            let severity = diff as f64 / total as f64;
            Some(Anomaly {
                category: AnomalyCategory::PowerVsOutcomeDivergence,
                reference: AnomalyReference {
                    proposal: Some(key_of(p)),
                    block_index: None,
                },
                severity,
            })
        })
        .collect()
}

/// Proposal turnout exceeding mean + 3 standard deviations of the trailing
/// window of prior proposals, ordered by voting start.
fn participation_spikes(proposals: &[Proposal], votes: &[Vote], eligible_power: u128) -> Vec<Anomaly> {
    if eligible_power == 0 {
        return Vec::new();
    }
    let mut cast_power: HashMap<ProposalRef, u128> = HashMap::new();
    for v in votes {
        *cast_power.entry(v.proposal.clone()).or_insert(0) += v.power;
    }

    let mut ordered: Vec<&Proposal> = proposals.iter().collect();
    ordered.sort_by_key(|p| p.voting_start);

    let turnouts: Vec<f64> = ordered
        .iter()
        .map(|p| cast_power.get(&key_of(p)).copied().unwrap_or(0) as f64 / eligible_power as f64)
        .collect();

    let mut out = Vec::new();
    for (idx, proposal) in ordered.iter().enumerate() {
        if idx < PARTICIPATION_SPIKE_MIN_WINDOW {
            continue;
        }
        let window = &turnouts[..idx];
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let variance = window.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / window.len() as f64;
        let stddev = variance.sqrt();
        let threshold = mean + PARTICIPATION_SPIKE_SIGMA * stddev;
        if turnouts[idx] > threshold {
            out.push(Anomaly {
                category: AnomalyCategory::ParticipationSpike,
                reference: AnomalyReference {
                    proposal: Some(key_of(proposal)),
                    block_index: None,
                },
                severity: if stddev == 0.0 {
                    turnouts[idx] - mean
                } else {
                    (turnouts[idx] - mean) / stddev
                },
            });
        }
    }
    out
}

/// Detect every anomaly category over a snapshot's proposals, votes, holders,
/// and already-discovered voting blocks.
pub fn detect_anomalies(
    proposals: &[Proposal],
    votes: &[Vote],
    holders: &[HolderBalance],
    blocks: &[VotingBlock],
    top_k: u32,
    eligible_power: u128,
) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    anomalies.extend(coordinated_voting(blocks, votes));
    anomalies.extend(whale_vs_outcome(holders, proposals, votes, top_k));
    anomalies.extend(power_vs_outcome_divergence(proposals));
    anomalies.extend(participation_spikes(proposals, votes, eligible_power));
    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use types::{ProposalStatus, ProtocolId, Tallies};

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    fn proposal(id: &str, status: ProposalStatus, for_: u128, against: u128) -> Proposal {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Proposal {
            protocol: ProtocolId::new("lending-a"),
            proposal_id: id.into(),
            proposer: addr(0),
            created_at: t,
            voting_start: t,
            voting_end: t + chrono::Duration::days(3),
            status,
            quorum: 0,
            tallies: Tallies { for_, against, abstain: 0 },
            metadata: None,
        }
    }

    #[test]
    fn zero_votes_emits_no_power_divergence() {
        let p = proposal("1", ProposalStatus::Defeated, 0, 0);
        let anomalies = power_vs_outcome_divergence(&[p]);
        assert!(anomalies.is_empty());
    }

    #[test]
    fn quorum_driven_flip_is_flagged() {
        // power favors "for" but the recorded outcome is a defeat.
        let p = proposal("1", ProposalStatus::Defeated, 900, 100);
        let anomalies = power_vs_outcome_divergence(&[p]);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].category, AnomalyCategory::PowerVsOutcomeDivergence);
    }

    #[test]
    fn consistent_outcome_is_not_flagged() {
        let p = proposal("1", ProposalStatus::Succeeded, 900, 100);
        let anomalies = power_vs_outcome_divergence(&[p]);
        assert!(anomalies.is_empty());
    }
}
