//! Named metric projections used by `series` (spec §4.8) and the Comparison
//! Engine (spec §4.9).

use types::{ProvenanceTag, Snapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricSelector {
    ConcentrationGini,
    ConcentrationHhi,
    ConcentrationNakamoto,
    ConcentrationPalma,
    ParticipationOverallTurnout,
    ParticipationDistinctVoters,
}

/// One point in a projected time series. `value` is `None` when the metric
/// doesn't exist for this snapshot (no analyzer run yet, or the metric itself
/// is undefined for the underlying data, e.g. a `null` Palma ratio) — a gap,
/// never interpolated (spec §4.8). `provenance` carries the source snapshot's
/// own tag, so a consumer (e.g. the Comparison Engine, spec §4.9) can tell a
/// simulated point from a live one without a second store round-trip.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub value: Option<f64>,
    pub provenance: ProvenanceTag,
}

pub fn project(snapshot: &Snapshot, selector: MetricSelector) -> Option<f64> {
    let metrics = snapshot.metrics.as_ref()?;
    match selector {
        MetricSelector::ConcentrationGini => Some(metrics.concentration.gini),
        MetricSelector::ConcentrationHhi => Some(metrics.concentration.hhi),
        MetricSelector::ConcentrationNakamoto => metrics.concentration.nakamoto.map(|n| n as f64),
        MetricSelector::ConcentrationPalma => metrics.concentration.palma,
        MetricSelector::ParticipationOverallTurnout => Some(metrics.participation.overall_turnout),
        MetricSelector::ParticipationDistinctVoters => {
            Some(metrics.participation.distinct_voter_count as f64)
        }
    }
}
