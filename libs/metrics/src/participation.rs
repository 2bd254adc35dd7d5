//! Governance participation measures (spec §4.6).
//!
//! Turnout is **power-weighted** throughout, with distinct-voter count reported
//! as a separate field — spec §9 fixes this as the authoritative resolution of
//! an ambiguity the source oscillated on.

use std::collections::{HashMap, HashSet};

use types::{Address, Choice, HolderBalance, Proposal, ProposalRef, Vote};
use types::{HolderBucket, ParticipationMetrics, WhaleBehavior};

/// Ascending bucket floors, base units. The last bucket is open-ended. Matches
/// the "decade" buckets spec §4.6 gives as an example: ≤1, 1-10, 10-100,
/// 100-1k, 1k-10k, >10k.
pub const DEFAULT_BUCKET_FLOORS: [u128; 6] = [0, 1, 10, 100, 1_000, 10_000];

/// Default top-K whale cohort size.
pub const DEFAULT_TOP_K: u32 = 10;

/// Compute the full participation metric set for a snapshot's proposals and
/// votes.
///
/// `eligible_power` is the total power eligible to vote, used as every
/// proposal's turnout denominator; this workspace's data model tracks one
/// holder-balance set per snapshot rather than a separate historical balance
/// per proposal, so all proposals in a snapshot share the same eligible power
/// (see `DESIGN.md`).
pub fn compute_participation(
    proposals: &[Proposal],
    votes: &[Vote],
    holders: &[HolderBalance],
    eligible_power: u128,
    top_k: u32,
    bucket_floors: &[u128],
) -> ParticipationMetrics {
    let turnout_by_proposal = turnout_per_proposal(proposals, votes, eligible_power);
    let overall_turnout = power_weighted_mean_turnout(&turnout_by_proposal);
    let distinct_voter_count = votes.iter().map(|v| v.voter).collect::<HashSet<_>>().len() as u64;
    let segmentation = segment_by_holding_size(holders, votes, bucket_floors);
    let whale_behavior = whale_behavior(holders, proposals, votes, top_k);

    ParticipationMetrics {
        turnout_by_proposal,
        overall_turnout,
        distinct_voter_count,
        segmentation,
        whale_behavior,
    }
}

fn turnout_per_proposal(
    proposals: &[Proposal],
    votes: &[Vote],
    eligible_power: u128,
) -> std::collections::BTreeMap<ProposalRef, f64> {
    let mut cast_power: HashMap<ProposalRef, u128> = HashMap::new();
    for v in votes {
        *cast_power.entry(v.proposal.clone()).or_insert(0) += v.power;
    }
    proposals
        .iter()
        .map(|p| {
            let key = ProposalRef {
                protocol: p.protocol.clone(),
                proposal_id: p.proposal_id.clone(),
            };
            let cast = cast_power.get(&key).copied().unwrap_or(0);
            let turnout = if eligible_power == 0 {
                0.0
            } else {
                cast as f64 / eligible_power as f64
            };
            (key, turnout)
        })
        .collect()
}

fn power_weighted_mean_turnout(turnout: &std::collections::BTreeMap<ProposalRef, f64>) -> f64 {
    if turnout.is_empty() {
        return 0.0;
    }
    // Every proposal in this snapshot shares the same eligible-power
    // denominator (see module docs), so a power-weighted mean reduces to a
    // plain mean of per-proposal turnout.
    turnout.values().sum::<f64>() / turnout.len() as f64
}

fn bucket_bounds(floors: &[u128]) -> Vec<(u128, Option<u128>)> {
    floors
        .iter()
        .enumerate()
        .map(|(i, &floor)| (floor, floors.get(i + 1).copied()))
        .collect()
}

fn bucket_index(balance: u128, bounds: &[(u128, Option<u128>)]) -> usize {
    for (idx, &(floor, ceiling)) in bounds.iter().enumerate() {
        if balance >= floor && ceiling.map(|c| balance < c).unwrap_or(true) {
            return idx;
        }
    }
    bounds.len().saturating_sub(1)
}

fn segment_by_holding_size(
    holders: &[HolderBalance],
    votes: &[Vote],
    floors: &[u128],
) -> Vec<HolderBucket> {
    let bounds = bucket_bounds(floors);
    let voted: HashSet<Address> = votes.iter().map(|v| v.voter).collect();

    let mut power_by_voter: HashMap<Address, u128> = HashMap::new();
    for v in votes {
        *power_by_voter.entry(v.voter).or_insert(0) += v.power;
    }
    let total_cast_power: u128 = power_by_voter.values().sum();

    let mut per_bucket_holder_count = vec![0u64; bounds.len()];
    let mut per_bucket_voter_count = vec![0u64; bounds.len()];
    let mut per_bucket_cast_power = vec![0u128; bounds.len()];

    for h in holders {
        let idx = bucket_index(h.balance, &bounds);
        per_bucket_holder_count[idx] += 1;
        if voted.contains(&h.address) {
            per_bucket_voter_count[idx] += 1;
            per_bucket_cast_power[idx] += power_by_voter.get(&h.address).copied().unwrap_or(0);
        }
    }

    bounds
        .into_iter()
        .enumerate()
        .map(|(idx, (floor, ceiling))| {
            let holder_count = per_bucket_holder_count[idx];
            let participation_rate = if holder_count == 0 {
                0.0
            } else {
                per_bucket_voter_count[idx] as f64 / holder_count as f64
            };
            let cast_power_share = if total_cast_power == 0 {
                0.0
            } else {
                per_bucket_cast_power[idx] as f64 / total_cast_power as f64
            };
            HolderBucket {
                floor,
                ceiling,
                voter_count: per_bucket_voter_count[idx],
                participation_rate,
                cast_power_share,
            }
        })
        .collect()
}

fn winning_choice(p: &Proposal) -> Option<Choice> {
    if p.tallies.for_ > p.tallies.against {
        Some(Choice::For)
    } else if p.tallies.against > p.tallies.for_ {
        Some(Choice::Against)
    } else {
        None
    }
}

fn whale_behavior(
    holders: &[HolderBalance],
    proposals: &[Proposal],
    votes: &[Vote],
    top_k: u32,
) -> WhaleBehavior {
    let mut sorted = holders.to_vec();
    sorted.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.address.cmp(&b.address)));
    let whales: HashSet<Address> = sorted.iter().take(top_k as usize).map(|h| h.address).collect();

    let proposals_by_ref: HashMap<ProposalRef, &Proposal> = proposals
        .iter()
        .map(|p| {
            (
                ProposalRef {
                    protocol: p.protocol.clone(),
                    proposal_id: p.proposal_id.clone(),
                },
                p,
            )
        })
        .collect();

    let mut whale_votes_total = 0u64;
    let mut whale_votes_matching_outcome = 0u64;
    let mut influence_sum = 0.0f64;
    let mut influence_count = 0u64;

    for v in votes.iter().filter(|v| whales.contains(&v.voter)) {
        let Some(&proposal) = proposals_by_ref.get(&v.proposal) else {
            continue;
        };
        let Some(winner) = winning_choice(proposal) else {
            continue;
        };
        whale_votes_total += 1;
        if v.choice == winner {
            whale_votes_matching_outcome += 1;
        }
    }

    for proposal in proposals {
        let Some(winner) = winning_choice(proposal) else {
            continue;
        };
        let winning_power = match winner {
            Choice::For => proposal.tallies.for_,
            Choice::Against => proposal.tallies.against,
            Choice::Abstain => continue,
        };
        if winning_power == 0 {
            continue;
        }
        let key = ProposalRef {
            protocol: proposal.protocol.clone(),
            proposal_id: proposal.proposal_id.clone(),
        };
        let whale_power_on_winning_side: u128 = votes
            .iter()
            .filter(|v| v.proposal == key && whales.contains(&v.voter) && v.choice == winner)
            .map(|v| v.power)
            .sum();
        if whale_power_on_winning_side == 0 {
            continue;
        }
        influence_sum += whale_power_on_winning_side as f64 / winning_power as f64;
        influence_count += 1;
    }

    WhaleBehavior {
        top_k,
        outcome_agreement_rate: if whale_votes_total == 0 {
            0.0
        } else {
            whale_votes_matching_outcome as f64 / whale_votes_total as f64
        },
        aggregate_influence: if influence_count == 0 {
            0.0
        } else {
            influence_sum / influence_count as f64
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use types::{ProposalStatus, ProtocolId, Tallies};

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    fn proposal(id: &str, for_: u128, against: u128) -> Proposal {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Proposal {
            protocol: ProtocolId::new("lending-a"),
            proposal_id: id.into(),
            proposer: addr(0),
            created_at: t,
            voting_start: t,
            voting_end: t + chrono::Duration::days(3),
            status: ProposalStatus::Succeeded,
            quorum: 0,
            tallies: Tallies {
                for_,
                against,
                abstain: 0,
            },
            metadata: None,
        }
    }

    fn vote(id: &str, voter: Address, choice: Choice, power: u128) -> Vote {
        Vote {
            proposal: ProposalRef {
                protocol: ProtocolId::new("lending-a"),
                proposal_id: id.into(),
            },
            voter,
            choice,
            power,
            cast_at: Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn zero_votes_gives_zero_turnout() {
        let p = proposal("1", 0, 0);
        let m = compute_participation(&[p], &[], &[], 1000, 10, &DEFAULT_BUCKET_FLOORS);
        assert_eq!(m.overall_turnout, 0.0);
        assert_eq!(m.distinct_voter_count, 0);
    }

    #[test]
    fn turnout_is_power_weighted_not_count_weighted() {
        let p = proposal("1", 900, 0);
        let votes = vec![vote("1", addr(1), Choice::For, 900)];
        let m = compute_participation(&[p], &votes, &[], 1000, 10, &DEFAULT_BUCKET_FLOORS);
        assert!((m.overall_turnout - 0.9).abs() < 1e-9);
        assert_eq!(m.distinct_voter_count, 1);
    }

    #[test]
    fn segmentation_buckets_holders_by_balance() {
        let holders = vec![
            HolderBalance {
                address: addr(1),
                balance: 5,
                rank: 1,
            },
            HolderBalance {
                address: addr(2),
                balance: 50_000,
                rank: 2,
            },
        ];
        let segs = segment_by_holding_size(&holders, &[], &DEFAULT_BUCKET_FLOORS);
        assert_eq!(segs.len(), DEFAULT_BUCKET_FLOORS.len());
        assert_eq!(segs[2].voter_count, 0); // 10-100 bucket, holder with 5 goes to bucket 1
    }

    #[test]
    fn whale_agreement_rate_reflects_matching_votes() {
        let holders = vec![HolderBalance {
            address: addr(1),
            balance: 1000,
            rank: 1,
        }];
        let p = proposal("1", 900, 100);
        let votes = vec![vote("1", addr(1), Choice::For, 900)];
        let wb = whale_behavior(&holders, &[p], &votes, 1);
        assert_eq!(wb.outcome_agreement_rate, 1.0);
        assert!(wb.aggregate_influence > 0.0);
    }
}
