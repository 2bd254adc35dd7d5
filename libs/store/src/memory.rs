//! In-memory Snapshot Store backend, used by tests and by the fallback
//! configuration path (spec §4.8).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use types::{GovError, ProtocolId, Snapshot};

use crate::selector::{project, MetricSelector, SeriesPoint};
use crate::SnapshotStore;

/// Each protocol gets its own lock, so writes to one protocol never block
/// reads or writes on another; readers within a protocol never block each
/// other.
#[derive(Default)]
pub struct MemoryStore {
    protocols: DashMap<ProtocolId, RwLock<BTreeMap<DateTime<Utc>, Snapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn put(&self, snapshot: Snapshot) -> Result<(), GovError> {
        let (protocol, timestamp) = snapshot.key();
        let entry = self.protocols.entry(protocol).or_default();
        let mut series = entry.write();
        if series.contains_key(&timestamp) {
            return Err(GovError::Validation(format!(
                "snapshot already exists for {timestamp}"
            )));
        }
        series.insert(timestamp, snapshot);
        Ok(())
    }

    fn get(&self, protocol: &ProtocolId, timestamp: DateTime<Utc>) -> Result<Option<Snapshot>, GovError> {
        let Some(entry) = self.protocols.get(protocol) else {
            return Ok(None);
        };
        Ok(entry.read().get(&timestamp).cloned())
    }

    fn nearest(&self, protocol: &ProtocolId, timestamp: DateTime<Utc>) -> Result<Option<Snapshot>, GovError> {
        let Some(entry) = self.protocols.get(protocol) else {
            return Ok(None);
        };
        let series = entry.read();
        Ok(series.range(..=timestamp).next_back().map(|(_, s)| s.clone()))
    }

    fn range(
        &self,
        protocol: &ProtocolId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>, GovError> {
        let Some(entry) = self.protocols.get(protocol) else {
            return Ok(Vec::new());
        };
        let series = entry.read();
        Ok(series.range(from..=to).map(|(_, s)| s.clone()).collect())
    }

    fn series(
        &self,
        protocol: &ProtocolId,
        selector: MetricSelector,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>, GovError> {
        let snapshots = self.range(protocol, from, to)?;
        Ok(snapshots
            .iter()
            .map(|s| SeriesPoint {
                timestamp: s.timestamp,
                value: project(s, selector),
                provenance: s.provenance,
            })
            .collect())
    }
}
