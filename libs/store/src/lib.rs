//! # Snapshot Store
//!
//! Write-once, append-only storage for analytical snapshots keyed by
//! `(protocol, timestamp)` (spec §4.8), with two backends: [`memory::MemoryStore`]
//! for tests and the in-memory configuration profile, and [`disk::DiskStore`]
//! for durable on-disk persistence. Concurrent readers are always allowed;
//! writes to the same protocol are serialized by a per-protocol lock.

mod disk;
mod memory;
mod selector;

use chrono::{DateTime, Utc};
use types::{GovError, ProtocolId, Snapshot};

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use selector::{MetricSelector, SeriesPoint};

/// The operations every Snapshot Store backend implements (spec §4.8).
pub trait SnapshotStore: Send + Sync {
    /// Persist a new snapshot. Errors if one already exists at `snapshot.key()`
    /// — the store is write-once.
    fn put(&self, snapshot: Snapshot) -> Result<(), GovError>;

    /// Exact lookup by key.
    fn get(&self, protocol: &ProtocolId, timestamp: DateTime<Utc>) -> Result<Option<Snapshot>, GovError>;

    /// The snapshot at or before `timestamp`, or `None` if none exists.
    fn nearest(&self, protocol: &ProtocolId, timestamp: DateTime<Utc>) -> Result<Option<Snapshot>, GovError>;

    /// All snapshots in `[from, to]`, ascending by timestamp.
    fn range(&self, protocol: &ProtocolId, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Snapshot>, GovError>;

    /// A dense projection of one metric over `[from, to]`. One point per
    /// snapshot that actually exists in range; no interpolation, no synthetic
    /// grid.
    fn series(
        &self,
        protocol: &ProtocolId,
        selector: MetricSelector,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>, GovError>;
}
