//! # Core Handle, Fetch Coordination, and the Comparison Engine
//!
//! The orchestration layer: the Fetch Coordinator (spec §4.2), the snapshot
//! build pipeline that wires it to the Normalizer, the analyzers, and the
//! Snapshot Store (spec §4.2-§4.8 dataflow), the standalone Simulator-only
//! build path, and the cross-protocol Comparison Engine (spec §4.9).
//!
//! Every operation here takes a [`Core`] handle explicitly rather than
//! reaching for process-wide state (spec §9: "a `Core` handle constructed
//! once at startup that owns the worker pools, cache, rate limiters, and
//! store; passed explicitly to all operations"). `Core` is the one thing a
//! CLI, dashboard, or test harness constructs; everything else is a plain
//! async function taking `&Core` plus call-specific arguments.

pub mod backoff;
pub mod build;
pub mod comparison;
pub mod concurrency;
pub mod coordinator;
pub mod metrics_counters;
pub mod registry;
pub mod simulate;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use types::{GovError, ProtocolId, Snapshot};

pub use coordinator::FetchCoordinator;
pub use metrics_counters::CoordinatorMetrics;
pub use registry::ProtocolRegistry;

/// Owns everything a build needs that must not be reconstructed per call: the
/// Fetch Coordinator (itself holding the response cache, circuit registry,
/// rate limiter, and concurrency gates), the configuration it was built from,
/// the protocol registry, and the Snapshot Store backend. Constructed once;
/// `analyze`/`compare`/`simulate`/`series` below all take it by reference.
pub struct Core {
    coordinator: FetchCoordinator,
    config: config::CoreConfig,
    registry: ProtocolRegistry,
    store: Arc<dyn store::SnapshotStore>,
}

impl Core {
    /// Build a `Core` from configuration, constructing one adapter per known
    /// source (spec §4.1) wired to `config.api_keys`, and the snapshot store
    /// backend named by `config.snapshot_store.backend`.
    pub fn new(config: config::CoreConfig) -> Self {
        let adapters = registry::build_default_adapters(&config.api_keys);
        let coordinator = FetchCoordinator::new(adapters, &config);
        let store: Arc<dyn store::SnapshotStore> = match config.snapshot_store.backend {
            config::StoreBackend::Mem => Arc::new(store::MemoryStore::new()),
            config::StoreBackend::Disk => Arc::new(store::DiskStore::new(config.snapshot_store.path.clone())),
        };
        Self {
            coordinator,
            config,
            registry: registry::default_registry(),
            store,
        }
    }

    /// Construct a `Core` around an already-built coordinator and registry,
    /// for callers that need non-default adapters or protocols (spec §9:
    /// "new protocols add new adapters without touching the core").
    pub fn with_parts(
        coordinator: FetchCoordinator,
        config: config::CoreConfig,
        registry: ProtocolRegistry,
        store: Arc<dyn store::SnapshotStore>,
    ) -> Self {
        Self {
            coordinator,
            config,
            registry,
            store,
        }
    }

    pub fn config(&self) -> &config::CoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn store::SnapshotStore {
        self.store.as_ref()
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.coordinator
    }
}

/// `analyze <protocol> [--limit N] [--at TIMESTAMP]` (spec §6), as a library
/// call: build and persist one snapshot for `protocol_id` as of `at`,
/// degrading per data kind to simulated data on fallback-chain exhaustion
/// (spec §4.2 rule 4) rather than failing the whole build.
pub async fn analyze(
    core: &Core,
    protocol_id: &ProtocolId,
    at: DateTime<Utc>,
    holder_limit: usize,
    deadline: Duration,
) -> Result<Snapshot, GovError> {
    build::build_snapshot(
        &core.coordinator,
        core.store.as_ref(),
        &core.config,
        &core.registry,
        protocol_id,
        at,
        holder_limit,
        deadline,
    )
    .await
}

/// `simulate <profile> [--holders N] [--seed S]` (spec §6): a snapshot built
/// entirely from the Simulator, with no adapter or coordinator involvement.
pub fn simulate(
    core: &Core,
    protocol_id: &ProtocolId,
    profile: simulator::Profile,
    holders: usize,
    at: DateTime<Utc>,
    seed_override: Option<u64>,
) -> Result<Snapshot, GovError> {
    let protocol = core
        .registry
        .get(protocol_id)
        .cloned()
        .ok_or_else(|| GovError::Validation(format!("unknown protocol {protocol_id}")))?;
    simulate::simulate_snapshot(&protocol, profile, holders, at, &core.config, seed_override)
}

/// `series <protocol> --metric NAME [--from T1] [--to T2]` (spec §6): a dense
/// projection of one metric over `[from, to]`, delegating directly to the
/// Snapshot Store (spec §4.8).
pub fn series(
    core: &Core,
    protocol_id: &ProtocolId,
    selector: store::MetricSelector,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<store::SeriesPoint>, GovError> {
    core.store.series(protocol_id, selector, from, to)
}

/// `compare <protocols...> [--metric NAME] [--from T1] [--to T2]` (spec §6):
/// a rectangular cross-protocol table plus a composite-score ranking (spec
/// §4.9).
pub fn compare(
    core: &Core,
    protocols: &[ProtocolId],
    selector: store::MetricSelector,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    max_skew: chrono::Duration,
) -> Result<comparison::ComparisonTable, GovError> {
    comparison::compare(core.store.as_ref(), protocols, selector, from, to, max_skew)
}
