//! Token-bucket rate limiting per source (spec §4.2 [FULL]: "concurrency cap
//! per source enforced by a counted semaphore" pairs with a request-rate cap
//! here, both keyed by `SourceId` rather than the teacher's `VenueId`).

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use dashmap::DashMap;
use governor::{DefaultDirectRateLimiter, Quota};
use types::SourceId;

#[derive(Clone)]
pub struct RateLimiter {
    limiters: HashMap<SourceId, Arc<DefaultDirectRateLimiter>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            limiters: HashMap::new(),
        }
    }

    pub fn configure_source(&mut self, source: SourceId, requests_per_minute: u32) {
        match NonZeroU32::try_from(requests_per_minute) {
            Ok(rate) => {
                let quota = Quota::per_minute(rate);
                self.limiters
                    .insert(source, Arc::new(DefaultDirectRateLimiter::direct(quota)));
            }
            Err(_) => {
                tracing::warn!(%source, requests_per_minute, "invalid rate limit, leaving source unthrottled");
            }
        }
    }

    /// Non-blocking check.
    pub fn check(&self, source: &SourceId) -> bool {
        self.limiters
            .get(source)
            .map(|limiter| limiter.check().is_ok())
            .unwrap_or(true)
    }

    /// Blocks until a slot opens, or forever if the source has no configured
    /// limit. The Fetch Coordinator wraps this in its own deadline.
    pub async fn wait(&self, source: &SourceId) {
        if let Some(limiter) = self.limiters.get(source) {
            limiter.until_ready().await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        let mut limiter = Self::new();
        limiter.configure_source(SourceId::new("etherscan"), 300);
        limiter.configure_source(SourceId::new("graph"), 600);
        limiter.configure_source(SourceId::new("alchemy"), 600);
        limiter.configure_source(SourceId::new("infura"), 300);
        limiter.configure_source(SourceId::new("ethplorer"), 60);
        limiter
    }
}

/// Running per-source request counters for observability (spec §4.10
/// [FULL]), kept as hand-rolled atomics rather than a metrics-crate
/// dependency (see DESIGN.md).
#[derive(Default)]
pub struct RateLimitTracker {
    requests: DashMap<SourceId, RequestStats>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, source: SourceId, rate_limited: bool) {
        self.requests
            .entry(source)
            .and_modify(|stats| {
                stats.total += 1;
                if rate_limited {
                    stats.rate_limited += 1;
                } else {
                    stats.successful += 1;
                }
            })
            .or_insert(RequestStats {
                total: 1,
                successful: if rate_limited { 0 } else { 1 },
                rate_limited: if rate_limited { 1 } else { 0 },
            });
    }

    pub fn stats(&self, source: &SourceId) -> Option<RequestStats> {
        self.requests.get(source).map(|e| e.value().clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestStats {
    pub total: u64,
    pub successful: u64,
    pub rate_limited: u64,
}

impl RequestStats {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64
        }
    }
}
