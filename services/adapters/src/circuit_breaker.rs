//! Per-source circuit breaker (closed → open → half-open), guarding the
//! Fetch Coordinator against a source that is failing repeatedly (spec §4.2
//! [FULL]). A source whose circuit is open is skipped exactly as a
//! retry-budget-exhausted source is: the coordinator advances to the next
//! fallback without attempting the call.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::RwLock;
use types::SourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, calls pass through.
    Closed,
    /// Failing, calls are rejected without being attempted.
    Open,
    /// Testing recovery, a limited number of calls are allowed through.
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub success_threshold: u32,
    pub half_open_max_failures: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 2,
            half_open_max_failures: 1,
        }
    }
}

pub struct CircuitBreaker {
    source: SourceId,
    state: RwLock<CircuitState>,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    last_failure_time: RwLock<Option<Instant>>,
    config: CircuitBreakerConfig,
    total_requests: AtomicU64,
    total_failures: AtomicU64,
    circuit_opens: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(source: SourceId, config: CircuitBreakerConfig) -> Self {
        Self {
            source,
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            last_failure_time: RwLock::new(None),
            config,
            total_requests: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            circuit_opens: AtomicU64::new(0),
        }
    }

    /// Whether the coordinator should attempt a call through this source
    /// right now. Transitions `Open` to `HalfOpen` once the recovery timeout
    /// has elapsed.
    pub async fn should_attempt(&self) -> bool {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.write().await;
        match *state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let last_failure = *self.last_failure_time.read().await;
                match last_failure {
                    Some(at) if at.elapsed() >= self.config.recovery_timeout => {
                        *state = CircuitState::HalfOpen;
                        self.failure_count.store(0, Ordering::Relaxed);
                        self.success_count.store(0, Ordering::Relaxed);
                        tracing::info!(source = %self.source, "circuit breaker transitioning to half-open");
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    pub async fn on_success(&self) {
        let mut state = self.state.write().await;
        match *state {
            CircuitState::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
                if successes >= self.config.success_threshold {
                    *state = CircuitState::Closed;
                    self.failure_count.store(0, Ordering::Relaxed);
                    tracing::info!(source = %self.source, successes, "circuit breaker closed");
                }
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Relaxed);
            }
            CircuitState::Open => {}
        }
    }

    pub async fn on_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.write().await;
        let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_failure_time.write().await = Some(Instant::now());

        match *state {
            CircuitState::Closed => {
                if failures >= self.config.failure_threshold {
                    *state = CircuitState::Open;
                    self.circuit_opens.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(source = %self.source, failures, "circuit breaker opened");
                }
            }
            CircuitState::HalfOpen => {
                if failures >= self.config.half_open_max_failures {
                    *state = CircuitState::Open;
                    self.circuit_opens.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(source = %self.source, "circuit breaker reopened from half-open");
                }
            }
            CircuitState::Open => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        *self.state.read().await
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        CircuitBreakerMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            circuit_opens: self.circuit_opens.load(Ordering::Relaxed),
            current_failure_count: self.failure_count.load(Ordering::Relaxed),
        }
    }

    pub async fn reset(&self) {
        *self.state.write().await = CircuitState::Closed;
        self.failure_count.store(0, Ordering::Relaxed);
        self.success_count.store(0, Ordering::Relaxed);
        *self.last_failure_time.write().await = None;
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerMetrics {
    pub total_requests: u64,
    pub total_failures: u64,
    pub circuit_opens: u64,
    pub current_failure_count: u32,
}

/// One circuit breaker per source, created lazily on first use.
#[derive(Default)]
pub struct CircuitRegistry {
    breakers: DashMap<SourceId, Arc<CircuitBreaker>>,
    config: CircuitBreakerConfig,
}

impl CircuitRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    pub fn breaker(&self, source: &SourceId) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(source.clone())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(source.clone(), self.config)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 2,
            recovery_timeout: Duration::from_millis(10),
            success_threshold: 1,
            half_open_max_failures: 1,
        }
    }

    #[tokio::test]
    async fn opens_after_failure_threshold() {
        let cb = CircuitBreaker::new(SourceId::new("etherscan"), test_config());
        assert!(cb.should_attempt().await);
        cb.on_failure().await;
        assert!(cb.should_attempt().await);
        cb.on_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(!cb.should_attempt().await);
    }

    #[tokio::test]
    async fn half_opens_after_recovery_timeout_then_closes_on_success() {
        let cb = CircuitBreaker::new(SourceId::new("etherscan"), test_config());
        cb.on_failure().await;
        cb.on_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cb.should_attempt().await);
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        cb.on_success().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[test]
    fn registry_returns_the_same_breaker_for_a_source() {
        let registry = CircuitRegistry::new(test_config());
        let a = registry.breaker(&SourceId::new("etherscan"));
        let b = registry.breaker(&SourceId::new("etherscan"));
        assert!(Arc::ptr_eq(&a, &b));
    }
}
