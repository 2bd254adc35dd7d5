//! Fetch Coordinator observability counters (spec §4.10). Hand-rolled atomics
//! rather than a metrics-crate dependency, matching `adapters::RateLimitTracker`
//! (see DESIGN.md for why `metrics`/`prometheus` were dropped).

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use types::SourceId;

#[derive(Debug, Default, Clone, Copy)]
pub struct SourceCounters {
    pub calls: u64,
    pub retries: u64,
    pub failures: u64,
}

#[derive(Default)]
struct AtomicSourceCounters {
    calls: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
}

/// Call/retry/failure/fallback/cache-hit counters, global and per-source.
#[derive(Default)]
pub struct CoordinatorMetrics {
    per_source: DashMap<SourceId, AtomicSourceCounters>,
    fallbacks: AtomicU64,
    cache_hits: AtomicU64,
    degraded_to_simulated: AtomicU64,
}

impl CoordinatorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self, source: &SourceId) {
        self.per_source
            .entry(source.clone())
            .or_default()
            .calls
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self, source: &SourceId) {
        self.per_source
            .entry(source.clone())
            .or_default()
            .retries
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, source: &SourceId) {
        self.per_source
            .entry(source.clone())
            .or_default()
            .failures
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degraded_to_simulated(&self) {
        self.degraded_to_simulated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn source_counters(&self, source: &SourceId) -> SourceCounters {
        match self.per_source.get(source) {
            Some(c) => SourceCounters {
                calls: c.calls.load(Ordering::Relaxed),
                retries: c.retries.load(Ordering::Relaxed),
                failures: c.failures.load(Ordering::Relaxed),
            },
            None => SourceCounters::default(),
        }
    }

    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn degraded_to_simulated(&self) -> u64 {
        self.degraded_to_simulated.load(Ordering::Relaxed)
    }
}
