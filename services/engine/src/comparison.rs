//! The Comparison Engine (spec §4.9): joins per-protocol `series` output into
//! a rectangular cross-protocol table, aligned on the coarser of
//! per-protocol timestamps within a configurable maximum skew, plus a
//! composite-score ranking from a caller-supplied weighted linear
//! combination of normalized metrics.

use chrono::{DateTime, Duration, Utc};
use types::{GovError, ProtocolId, ProvenanceTag};

/// One cell in a [`ComparisonTable`]: `None` when no protocol series had a
/// point within `max_skew` of this row's timestamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComparisonCell {
    pub value: f64,
    pub provenance: ProvenanceTag,
}

/// Rows are aligned timestamps, columns are protocols, in the order given to
/// [`compare`].
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonTable {
    pub protocols: Vec<ProtocolId>,
    pub timestamps: Vec<DateTime<Utc>>,
    /// `rows[i][j]` is the cell for `timestamps[i]`, `protocols[j]`.
    pub rows: Vec<Vec<Option<ComparisonCell>>>,
}

impl ComparisonTable {
    fn column(&self, protocol: &ProtocolId) -> usize {
        self.protocols.iter().position(|p| p == protocol).expect("protocol is a column of this table")
    }

    /// Rank protocols by a composite score: for each protocol, the mean
    /// across rows of its cell value times `weight`, skipping rows where
    /// that protocol has no aligned point. Protocols with zero scored rows
    /// rank last, tagged with a `None` score rather than a synthetic zero.
    pub fn rank_by(&self, weight: f64) -> Vec<(ProtocolId, Option<f64>)> {
        let mut scored: Vec<(ProtocolId, Option<f64>)> = self
            .protocols
            .iter()
            .map(|protocol| {
                let col = self.column(protocol);
                let values: Vec<f64> = self.rows.iter().filter_map(|row| row[col].map(|c| c.value)).collect();
                if values.is_empty() {
                    (protocol.clone(), None)
                } else {
                    let mean = values.iter().sum::<f64>() / values.len() as f64;
                    (protocol.clone(), Some(mean * weight))
                }
            })
            .collect();
        scored.sort_by(|a, b| match (a.1, b.1) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });
        scored
    }
}

/// Join `series(protocol, selector, from, to)` across `protocols` on
/// nearest-earlier alignment: the table's row timestamps are the union of
/// every protocol's own series timestamps, and a protocol's cell for a row
/// is its own most recent point at or before that row's timestamp, provided
/// that point is within `max_skew` of it.
pub fn compare(
    store: &dyn store::SnapshotStore,
    protocols: &[ProtocolId],
    selector: store::MetricSelector,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    max_skew: Duration,
) -> Result<ComparisonTable, GovError> {
    if protocols.is_empty() {
        return Err(GovError::Validation("compare requires at least one protocol".to_string()));
    }

    let mut per_protocol = Vec::with_capacity(protocols.len());
    let mut all_timestamps: Vec<DateTime<Utc>> = Vec::new();
    for protocol in protocols {
        let points = store.series(protocol, selector, from, to)?;
        all_timestamps.extend(points.iter().map(|p| p.timestamp));
        per_protocol.push(points);
    }
    all_timestamps.sort();
    all_timestamps.dedup();

    let rows = all_timestamps
        .iter()
        .map(|&row_ts| {
            per_protocol
                .iter()
                .map(|points| {
                    points
                        .iter()
                        .filter(|p| p.timestamp <= row_ts && row_ts - p.timestamp <= max_skew)
                        .max_by_key(|p| p.timestamp)
                        .and_then(|p| p.value.map(|value| ComparisonCell { value, provenance: p.provenance }))
                })
                .collect::<Vec<_>>()
        })
        .collect();

    Ok(ComparisonTable {
        protocols: protocols.to_vec(),
        timestamps: all_timestamps,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ProtocolId, ProvenanceTag, Snapshot};

    fn snapshot_with_gini(protocol: &str, ts: DateTime<Utc>, gini: f64, provenance: ProvenanceTag) -> Snapshot {
        let metrics = types::SnapshotMetrics {
            concentration: types::ConcentrationMetrics {
                gini,
                hhi: 0.0,
                nakamoto: None,
                palma: None,
                top_n_shares: Default::default(),
                lorenz_points: Vec::new(),
                degenerate: false,
            },
            participation: metrics::compute_participation(&[], &[], &[], 0, 10, &[]),
            voting_blocks: Vec::new(),
            anomalies: Vec::new(),
        };
        Snapshot::new(ProtocolId::new(protocol), ts, Vec::new(), Vec::new(), Vec::new(), Vec::new(), provenance)
            .with_metrics(metrics)
    }

    /// `Snapshot::new` truncates to whole seconds (spec §3); these tests
    /// compare against the input timestamp directly, so it must already be
    /// truncated to match the key actually stored.
    fn whole_second_now() -> DateTime<Utc> {
        DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap()
    }

    #[test]
    fn aligns_rows_within_max_skew_and_reports_gaps_beyond_it() {
        let store = store::MemoryStore::new();
        let t0 = whole_second_now();
        let t1 = t0 + Duration::hours(1);

        store.put(snapshot_with_gini("lending-a", t0, 0.1, ProvenanceTag::Live)).unwrap();
        store.put(snapshot_with_gini("lending-a", t1, 0.2, ProvenanceTag::Live)).unwrap();
        store.put(snapshot_with_gini("exchange-a", t0, 0.5, ProvenanceTag::Simulated)).unwrap();

        let protocols = vec![ProtocolId::new("lending-a"), ProtocolId::new("exchange-a")];
        let table = compare(
            &store,
            &protocols,
            store::MetricSelector::ConcentrationGini,
            t0 - Duration::minutes(1),
            t1 + Duration::minutes(1),
            Duration::minutes(5),
        )
        .unwrap();

        assert_eq!(table.timestamps, vec![t0, t1]);
        assert_eq!(table.rows[0][0].unwrap().value, 0.1);
        assert_eq!(table.rows[0][1].unwrap().value, 0.5);
        assert_eq!(table.rows[1][0].unwrap().value, 0.2);
        // exchange-a has no point at t1 and its only point at t0 is more
        // than max_skew away from t1, so the cell is a gap.
        assert!(table.rows[1][1].is_none());
    }

    #[test]
    fn rank_by_favors_the_higher_mean_and_puts_unscored_protocols_last() {
        let store = store::MemoryStore::new();
        let t0 = whole_second_now();
        store.put(snapshot_with_gini("lending-a", t0, 0.8, ProvenanceTag::Live)).unwrap();
        store.put(snapshot_with_gini("lending-b", t0, 0.2, ProvenanceTag::Live)).unwrap();

        let protocols = vec![ProtocolId::new("lending-a"), ProtocolId::new("lending-b"), ProtocolId::new("exchange-a")];
        let table = compare(
            &store,
            &protocols,
            store::MetricSelector::ConcentrationGini,
            t0 - Duration::minutes(1),
            t0 + Duration::minutes(1),
            Duration::minutes(5),
        )
        .unwrap();

        let ranked = table.rank_by(1.0);
        assert_eq!(ranked[0].0, ProtocolId::new("lending-a"));
        assert_eq!(ranked[1].0, ProtocolId::new("lending-b"));
        assert_eq!(ranked[2].0, ProtocolId::new("exchange-a"));
        assert!(ranked[2].1.is_none());
    }

    #[test]
    fn rejects_an_empty_protocol_list() {
        let store = store::MemoryStore::new();
        let err = compare(&store, &[], store::MetricSelector::ConcentrationGini, Utc::now(), Utc::now(), Duration::minutes(1))
            .unwrap_err();
        assert!(matches!(err, GovError::Validation(_)));
    }
}
