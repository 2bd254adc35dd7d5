//! The snapshot build pipeline (spec §4.2 dataflow: Fetch Coordinator →
//! Provider Adapters (or Simulator on fallback) → Normalizer → analyzers →
//! Snapshot Store).
//!
//! Each of the four data kinds degrades to the simulator independently when
//! its own fallback chain is exhausted (spec §4.2 rule 4): a protocol with a
//! working holder index but a broken subgraph still gets live holders and
//! simulated governance activity, tagged accordingly, rather than failing
//! the whole build.

use std::time::Duration;

use chrono::{DateTime, Utc};
use types::{GovError, HolderBalance, Protocol, ProtocolId, ProvenanceTag, Snapshot, SnapshotMetrics};

use crate::coordinator::FetchCoordinator;
use crate::registry::ProtocolRegistry;

/// Default holders a simulated fallback generates when no real count is
/// known (spec §4.4 gives no default; chosen to keep simulated snapshots
/// comparable in scale to the three built-in protocols).
const SIMULATED_FALLBACK_HOLDER_COUNT: usize = 500;

/// Mean proposal count for the Poisson process backing simulated governance
/// activity (spec §4.4).
const SIMULATED_PROPOSAL_LAMBDA: f64 = 4.0;

fn simulated_target_participants(holder_count: usize) -> usize {
    holder_count.clamp(10, 500)
}

/// Build and persist one analytical snapshot for `protocol_id` as of `at`.
///
/// `deadline` bounds the whole build (spec §4.2 "Cancellation": exceeding it
/// surfaces `GovError::Cancelled` with partial work discarded, never a
/// partially-visible snapshot).
pub async fn build_snapshot(
    coordinator: &FetchCoordinator,
    store: &dyn store::SnapshotStore,
    config: &config::CoreConfig,
    registry: &ProtocolRegistry,
    protocol_id: &ProtocolId,
    at: DateTime<Utc>,
    holder_limit: usize,
    deadline: Duration,
) -> Result<Snapshot, GovError> {
    let protocol = registry
        .get(protocol_id)
        .cloned()
        .ok_or_else(|| GovError::Validation(format!("unknown protocol {protocol_id}")))?;

    tokio::time::timeout(deadline, build_inner(coordinator, config, &protocol, at, holder_limit, deadline))
        .await
        .map_err(|_| GovError::Cancelled(format!("snapshot build for {protocol_id} exceeded its deadline")))??
        .persist(store)
}

async fn build_inner(
    coordinator: &FetchCoordinator,
    config: &config::CoreConfig,
    protocol: &Protocol,
    at: DateTime<Utc>,
    holder_limit: usize,
    per_call_deadline: Duration,
) -> Result<PendingSnapshot, GovError> {
    let (holders, holders_tier) = fetch_holders_or_simulate(coordinator, config, protocol, holder_limit, per_call_deadline).await;

    let (proposals, votes, proposals_tier, votes_tier) =
        fetch_governance_or_simulate(coordinator, config, protocol, &holders, at, per_call_deadline).await;

    let (delegations, delegations_tier) = fetch_delegations_or_empty(coordinator, config, protocol, at, per_call_deadline).await;

    let eligible_power = types::total_balance(&holders);
    let metrics = compute_metrics(&holders, &proposals, &votes, eligible_power, &config.voting_blocks);

    let provenance = ProvenanceTag::combine([holders_tier, proposals_tier, votes_tier, delegations_tier])
        .unwrap_or(ProvenanceTag::Live);

    let snapshot = Snapshot::new(protocol.id.clone(), at, holders, proposals, votes, delegations, provenance).with_metrics(metrics);
    Ok(PendingSnapshot(snapshot))
}

/// A fully-computed snapshot not yet handed to the store, so that a
/// cancellation before this point never risks a partially-written record.
struct PendingSnapshot(Snapshot);

impl PendingSnapshot {
    /// Persist to the store, retrying once on `StorageIo` before surfacing it
    /// (spec §7: "Retried once; surfaced on second failure").
    fn persist(self, store: &dyn store::SnapshotStore) -> Result<Snapshot, GovError> {
        match store.put(self.0.clone()) {
            Ok(()) => Ok(self.0),
            Err(GovError::StorageIo(reason)) => {
                tracing::warn!(reason = %reason, "snapshot store write failed, retrying once");
                store.put(self.0.clone())?;
                Ok(self.0)
            }
            Err(err) => Err(err),
        }
    }
}

async fn fetch_holders_or_simulate(
    coordinator: &FetchCoordinator,
    config: &config::CoreConfig,
    protocol: &Protocol,
    holder_limit: usize,
    deadline: Duration,
) -> (Vec<HolderBalance>, ProvenanceTag) {
    let chain = config.fallback_chain.chain_for(config::DataKind::Holders);
    match coordinator.fetch_holders(&chain, protocol, holder_limit, deadline).await {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(protocol = %protocol.id, error = %err, "holder fallback chain exhausted, degrading to simulated data");
            coordinator.metrics().record_degraded_to_simulated();
            let holders = simulator::generate_holders(
                simulator::Profile::PowerLaw,
                holder_limit.min(SIMULATED_FALLBACK_HOLDER_COUNT).max(1),
                protocol.total_supply,
                &config.simulator,
            );
            (holders, ProvenanceTag::Simulated)
        }
    }
}

async fn fetch_governance_or_simulate(
    coordinator: &FetchCoordinator,
    config: &config::CoreConfig,
    protocol: &Protocol,
    holders: &[HolderBalance],
    at: DateTime<Utc>,
    deadline: Duration,
) -> (Vec<types::Proposal>, Vec<types::Vote>, ProvenanceTag, ProvenanceTag) {
    let proposals_chain = config.fallback_chain.chain_for(config::DataKind::Proposals);
    let since = DateTime::<Utc>::from_timestamp(0, 0).unwrap_or(at);

    let (proposals, proposals_tier) = match coordinator.fetch_proposals(&proposals_chain, protocol, since, at, deadline).await {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(protocol = %protocol.id, error = %err, "proposal fallback chain exhausted, degrading governance activity to simulated data");
            coordinator.metrics().record_degraded_to_simulated();
            let (proposals, votes) = simulator::simulate_proposals(
                &protocol.id,
                holders,
                SIMULATED_PROPOSAL_LAMBDA,
                simulated_target_participants(holders.len()),
                simulator::ChoiceProfile::default(),
                at,
                config.simulator.seed,
            );
            return (proposals, votes, ProvenanceTag::Simulated, ProvenanceTag::Simulated);
        }
    };

    let votes_chain = config.fallback_chain.chain_for(config::DataKind::Votes);
    let mut votes = Vec::new();
    let mut votes_tier = None;
    for proposal in &proposals {
        let proposal_ref = types::ProposalRef {
            protocol: proposal.protocol.clone(),
            proposal_id: proposal.proposal_id.clone(),
        };
        match coordinator.fetch_votes(&votes_chain, &proposal_ref, deadline).await {
            Ok((mut batch, tier)) => {
                votes.append(&mut batch);
                votes_tier = Some(votes_tier.map_or(tier, |existing: ProvenanceTag| existing.weaker(tier)));
            }
            Err(err) => {
                tracing::warn!(
                    protocol = %protocol.id,
                    proposal_id = %proposal.proposal_id,
                    error = %err,
                    "vote fallback chain exhausted for this proposal, proceeding with no votes for it"
                );
            }
        }
    }

    (proposals, votes, proposals_tier, votes_tier.unwrap_or(ProvenanceTag::Live))
}

/// The simulator has no delegation generator (spec §4.4 covers holders and
/// governance activity only), so an exhausted delegation chain degrades to an
/// empty delegation set rather than fabricating one (see DESIGN.md).
async fn fetch_delegations_or_empty(
    coordinator: &FetchCoordinator,
    config: &config::CoreConfig,
    protocol: &Protocol,
    at: DateTime<Utc>,
    deadline: Duration,
) -> (Vec<types::Delegation>, ProvenanceTag) {
    let chain = config.fallback_chain.chain_for(config::DataKind::Delegations);
    let since = DateTime::<Utc>::from_timestamp(0, 0).unwrap_or(at);
    match coordinator.fetch_delegations(&chain, protocol, since, at, deadline).await {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(protocol = %protocol.id, error = %err, "delegation fallback chain exhausted, proceeding with no delegations");
            (Vec::new(), ProvenanceTag::Simulated)
        }
    }
}

pub(crate) fn compute_metrics(
    holders: &[HolderBalance],
    proposals: &[types::Proposal],
    votes: &[types::Vote],
    eligible_power: u128,
    voting_blocks_cfg: &config::VotingBlocksConfig,
) -> SnapshotMetrics {
    let balances: Vec<u128> = holders.iter().map(|h| h.balance).collect();
    let concentration = metrics::compute_concentration(&balances);
    let participation = metrics::compute_participation(
        proposals,
        votes,
        holders,
        eligible_power,
        metrics::participation::DEFAULT_TOP_K,
        &metrics::participation::DEFAULT_BUCKET_FLOORS,
    );
    let voting_blocks = graph::analyze_voting_blocks(votes, holders, voting_blocks_cfg);
    let anomalies = graph::detect_anomalies(
        proposals,
        votes,
        holders,
        &voting_blocks,
        metrics::participation::DEFAULT_TOP_K,
        eligible_power,
    );

    SnapshotMetrics {
        concentration,
        participation,
        voting_blocks,
        anomalies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_registry;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A store whose `put` fails its first `fail_times` calls with
    /// `StorageIo`, then delegates to an in-memory store.
    struct FlakyPutStore {
        inner: store::MemoryStore,
        fail_times: u32,
        attempts: AtomicU32,
    }

    impl store::SnapshotStore for FlakyPutStore {
        fn put(&self, snapshot: Snapshot) -> Result<(), GovError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_times {
                return Err(GovError::StorageIo("simulated disk failure".to_string()));
            }
            self.inner.put(snapshot)
        }

        fn get(&self, protocol: &ProtocolId, timestamp: chrono::DateTime<Utc>) -> Result<Option<Snapshot>, GovError> {
            self.inner.get(protocol, timestamp)
        }

        fn nearest(&self, protocol: &ProtocolId, timestamp: chrono::DateTime<Utc>) -> Result<Option<Snapshot>, GovError> {
            self.inner.nearest(protocol, timestamp)
        }

        fn range(
            &self,
            protocol: &ProtocolId,
            from: chrono::DateTime<Utc>,
            to: chrono::DateTime<Utc>,
        ) -> Result<Vec<Snapshot>, GovError> {
            self.inner.range(protocol, from, to)
        }

        fn series(
            &self,
            protocol: &ProtocolId,
            selector: store::MetricSelector,
            from: chrono::DateTime<Utc>,
            to: chrono::DateTime<Utc>,
        ) -> Result<Vec<store::SeriesPoint>, GovError> {
            self.inner.series(protocol, selector, from, to)
        }
    }

    fn pending(ts: DateTime<Utc>) -> PendingSnapshot {
        PendingSnapshot(Snapshot::new(
            types::ProtocolId::new("lending-a"),
            ts,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            ProvenanceTag::Simulated,
        ))
    }

    #[test]
    fn persist_retries_once_on_storage_io_then_succeeds() {
        let store = FlakyPutStore {
            inner: store::MemoryStore::new(),
            fail_times: 1,
            attempts: AtomicU32::new(0),
        };
        let snapshot = pending(Utc::now()).persist(&store).unwrap();
        assert!(store::SnapshotStore::get(&store, &snapshot.protocol, snapshot.timestamp).unwrap().is_some());
    }

    #[test]
    fn persist_surfaces_storage_io_after_a_second_failure() {
        let store = FlakyPutStore {
            inner: store::MemoryStore::new(),
            fail_times: 2,
            attempts: AtomicU32::new(0),
        };
        let err = pending(Utc::now()).persist(&store).unwrap_err();
        assert!(matches!(err, GovError::StorageIo(_)));
    }

    #[tokio::test]
    async fn build_degrades_fully_to_simulated_when_no_adapters_are_registered() {
        let config = config::CoreConfig::default();
        let coordinator = FetchCoordinator::new(HashMap::new(), &config);
        let registry = default_registry();
        let store = store::MemoryStore::new();
        let protocol_id = types::ProtocolId::new("lending-a");

        let snapshot = build_snapshot(
            &coordinator,
            &store,
            &config,
            &registry,
            &protocol_id,
            Utc::now(),
            50,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(snapshot.provenance, ProvenanceTag::Simulated);
        assert!(!snapshot.holders.is_empty());
        assert!(snapshot.metrics.is_some());
        assert!(store::SnapshotStore::get(&store, &protocol_id, snapshot.timestamp).unwrap().is_some());
    }

    #[tokio::test]
    async fn build_rejects_an_unknown_protocol() {
        let config = config::CoreConfig::default();
        let coordinator = FetchCoordinator::new(HashMap::new(), &config);
        let registry = ProtocolRegistry::new();
        let store = store::MemoryStore::new();

        let err = build_snapshot(
            &coordinator,
            &store,
            &config,
            &registry,
            &types::ProtocolId::new("nonexistent"),
            Utc::now(),
            50,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GovError::Validation(_)));
    }
}
