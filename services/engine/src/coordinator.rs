//! The Fetch Coordinator (spec §4.2): per-kind fallback-chain traversal over
//! [`ProviderAdapter`]s, with retry/backoff, circuit breaking, bounded
//! concurrency, response caching, and provenance tagging. Normalization
//! (spec §4.3) happens immediately after each successful fetch so that an
//! insufficient survivor share advances the chain exactly like a transport
//! failure would.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use adapters::{CacheKey, CircuitRegistry, ProviderAdapter, RateLimiter, ResponseCache};
use config::{CacheConfig, ConcurrencyConfig, CoreConfig, DataKind, RetryConfig};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use types::{GovError, Protocol, ProposalRef, ProvenanceTag, SourceId};

use crate::backoff::compute_delay;
use crate::concurrency::ConcurrencyGate;
use crate::metrics_counters::CoordinatorMetrics;

pub struct FetchCoordinator {
    adapters: HashMap<SourceId, Arc<dyn ProviderAdapter>>,
    retry: RetryConfig,
    cache_cfg: CacheConfig,
    cache: ResponseCache,
    circuits: CircuitRegistry,
    rate_limiter: RateLimiter,
    global_gate: ConcurrencyGate,
    source_gates: DashMap<SourceId, Arc<ConcurrencyGate>>,
    concurrency_cfg: ConcurrencyConfig,
    metrics: CoordinatorMetrics,
}

impl FetchCoordinator {
    pub fn new(adapters: HashMap<SourceId, Arc<dyn ProviderAdapter>>, config: &CoreConfig) -> Self {
        Self {
            adapters,
            retry: config.retry,
            cache_cfg: config.cache,
            cache: ResponseCache::new(config.cache.max_entries),
            circuits: CircuitRegistry::default(),
            rate_limiter: RateLimiter::default(),
            global_gate: ConcurrencyGate::new(config.concurrency.global),
            source_gates: DashMap::new(),
            concurrency_cfg: config.concurrency,
            metrics: CoordinatorMetrics::new(),
        }
    }

    pub fn register(&mut self, source: SourceId, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(source, adapter);
    }

    pub fn metrics(&self) -> &CoordinatorMetrics {
        &self.metrics
    }

    fn source_gate(&self, source: &SourceId) -> Arc<ConcurrencyGate> {
        if let Some(gate) = self.source_gates.get(source) {
            return gate.clone();
        }
        self.source_gates
            .entry(source.clone())
            .or_insert_with(|| Arc::new(ConcurrencyGate::new(self.concurrency_cfg.per_source)))
            .clone()
    }

    /// Execute one adapter call with caching, circuit breaking, bounded
    /// concurrency, and retry-with-backoff. Returns the decoded value plus
    /// the provenance tier the value was obtained at.
    async fn call_with_retry<T, F, Fut>(
        &self,
        source: &SourceId,
        call_name: &str,
        cache_key: Option<CacheKey>,
        ttl: Duration,
        make_call: F,
    ) -> Result<(T, ProvenanceTag), GovError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GovError>>,
    {
        if let Some(key) = cache_key.as_ref() {
            if let Some(value) = self.cache.get(key) {
                self.metrics.record_cache_hit();
                let parsed: T = serde_json::from_value(value)?;
                return Ok((parsed, ProvenanceTag::Cached));
            }
        }

        let breaker = self.circuits.breaker(source);
        if !breaker.should_attempt().await {
            return Err(GovError::TransientUnavailable {
                source: source.clone(),
                reason: "circuit open".to_string(),
            });
        }

        let gate = self.source_gate(source);
        let _global_permit = self.global_gate.acquire(source).await?;
        let _source_permit = gate.acquire(source).await?;

        let mut attempt: u32 = 0;
        loop {
            self.metrics.record_call(source);
            self.rate_limiter.wait(source).await;
            let started = Instant::now();
            let outcome = make_call().await;
            tracing::debug!(
                source = %source,
                call = call_name,
                attempt,
                elapsed_ms = started.elapsed().as_millis() as u64,
                ok = outcome.is_ok(),
                "adapter call completed"
            );
            match outcome {
                Ok(value) => {
                    breaker.on_success().await;
                    if let Some(key) = cache_key {
                        if let Ok(json) = serde_json::to_value(&value) {
                            self.cache.put(key, json, ttl);
                        }
                    }
                    return Ok((value, ProvenanceTag::Live));
                }
                Err(err) if err.skips_source() => {
                    self.metrics.record_failure(source);
                    breaker.on_failure().await;
                    return Err(err);
                }
                Err(err) if err.is_retryable() => {
                    attempt += 1;
                    self.metrics.record_retry(source);
                    if attempt >= self.retry.max_attempts {
                        self.metrics.record_failure(source);
                        breaker.on_failure().await;
                        return Err(err);
                    }
                    let delay = match &err {
                        GovError::RateLimited { retry_after: Some(d), .. } => *d,
                        _ => compute_delay(
                            Duration::from_millis(self.retry.base_ms),
                            Duration::from_millis(self.retry.ceiling_ms),
                            attempt - 1,
                        ),
                    };
                    tracing::warn!(
                        source = %source,
                        call = call_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying adapter call"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(err) => {
                    self.metrics.record_failure(source);
                    breaker.on_failure().await;
                    return Err(err);
                }
            }
        }
    }

    fn chain_exhausted(kind: &str) -> GovError {
        GovError::TransientUnavailable {
            source: SourceId::new("fallback-chain"),
            reason: format!("every configured source was exhausted for {kind}"),
        }
    }

    pub async fn fetch_holders(
        &self,
        chain: &[SourceId],
        protocol: &Protocol,
        limit: usize,
        deadline: Duration,
    ) -> Result<(Vec<types::HolderBalance>, ProvenanceTag), GovError> {
        let ttl = Duration::from_secs(self.cache_cfg.ttl_for(DataKind::Holders));
        for source in chain {
            let Some(adapter) = self.adapters.get(source).cloned() else {
                continue;
            };
            let cache_key = Some(CacheKey::new(source.clone(), "fetch_holders", format!("{}:{limit}", protocol.id)));
            let protocol = protocol.clone();
            let call = move || {
                let adapter = adapter.clone();
                let protocol = protocol.clone();
                async move { adapter.fetch_holders(&protocol, limit, None, deadline).await }
            };
            match self
                .call_with_retry::<adapters::raw::HolderPage, _, _>(source, "fetch_holders", cache_key, ttl, call)
                .await
            {
                Ok((page, tier)) => {
                    let batch = adapters::normalizer::normalize_holders(page.holders);
                    if batch.meets_minimum() {
                        return Ok((types::rank_holders(batch.records), tier));
                    }
                    tracing::warn!(
                        source = %source,
                        survivor_share = batch.survivor_share(),
                        "holder batch failed the survivor threshold, advancing fallback chain"
                    );
                    self.metrics.record_fallback();
                }
                Err(err) => {
                    tracing::warn!(source = %source, error = %err, "fetch_holders failed, advancing fallback chain");
                    self.metrics.record_fallback();
                }
            }
        }
        Err(Self::chain_exhausted("holders"))
    }

    pub async fn fetch_proposals(
        &self,
        chain: &[SourceId],
        protocol: &Protocol,
        since: chrono::DateTime<chrono::Utc>,
        until: chrono::DateTime<chrono::Utc>,
        deadline: Duration,
    ) -> Result<(Vec<types::Proposal>, ProvenanceTag), GovError> {
        let ttl = Duration::from_secs(self.cache_cfg.ttl_for(DataKind::Proposals));
        for source in chain {
            let Some(adapter) = self.adapters.get(source).cloned() else {
                continue;
            };
            let cache_key = Some(CacheKey::new(
                source.clone(),
                "fetch_proposals",
                format!("{}:{since}:{until}", protocol.id),
            ));
            let protocol_owned = protocol.clone();
            let call = move || {
                let adapter = adapter.clone();
                let protocol = protocol_owned.clone();
                async move { adapter.fetch_proposals(&protocol, since, until, deadline).await }
            };
            match self
                .call_with_retry::<Vec<adapters::raw::RawProposal>, _, _>(source, "fetch_proposals", cache_key, ttl, call)
                .await
            {
                Ok((raw, tier)) => {
                    let batch = adapters::normalizer::normalize_proposals(&protocol.id, raw);
                    if batch.meets_minimum() {
                        return Ok((batch.records, tier));
                    }
                    tracing::warn!(
                        source = %source,
                        survivor_share = batch.survivor_share(),
                        "proposal batch failed the survivor threshold, advancing fallback chain"
                    );
                    self.metrics.record_fallback();
                }
                Err(err) => {
                    tracing::warn!(source = %source, error = %err, "fetch_proposals failed, advancing fallback chain");
                    self.metrics.record_fallback();
                }
            }
        }
        Err(Self::chain_exhausted("proposals"))
    }

    pub async fn fetch_votes(
        &self,
        chain: &[SourceId],
        proposal: &ProposalRef,
        deadline: Duration,
    ) -> Result<(Vec<types::Vote>, ProvenanceTag), GovError> {
        let ttl = Duration::from_secs(self.cache_cfg.ttl_for(DataKind::Votes));
        for source in chain {
            let Some(adapter) = self.adapters.get(source).cloned() else {
                continue;
            };
            let cache_key = Some(CacheKey::new(
                source.clone(),
                "fetch_votes",
                format!("{}:{}", proposal.protocol, proposal.proposal_id),
            ));
            let proposal_owned = proposal.clone();
            let call = move || {
                let adapter = adapter.clone();
                let proposal = proposal_owned.clone();
                async move { adapter.fetch_votes(&proposal, deadline).await }
            };
            match self
                .call_with_retry::<Vec<adapters::raw::RawVote>, _, _>(source, "fetch_votes", cache_key, ttl, call)
                .await
            {
                Ok((raw, tier)) => {
                    let batch = adapters::normalizer::normalize_votes(&proposal.protocol, raw);
                    if batch.meets_minimum() {
                        return Ok((adapters::normalizer::dedupe_votes(batch.records), tier));
                    }
                    tracing::warn!(
                        source = %source,
                        survivor_share = batch.survivor_share(),
                        "vote batch failed the survivor threshold, advancing fallback chain"
                    );
                    self.metrics.record_fallback();
                }
                Err(err) => {
                    tracing::warn!(source = %source, error = %err, "fetch_votes failed, advancing fallback chain");
                    self.metrics.record_fallback();
                }
            }
        }
        Err(Self::chain_exhausted("votes"))
    }

    pub async fn fetch_delegations(
        &self,
        chain: &[SourceId],
        protocol: &Protocol,
        since: chrono::DateTime<chrono::Utc>,
        until: chrono::DateTime<chrono::Utc>,
        deadline: Duration,
    ) -> Result<(Vec<types::Delegation>, ProvenanceTag), GovError> {
        let ttl = Duration::from_secs(self.cache_cfg.ttl_for(DataKind::Delegations));
        for source in chain {
            let Some(adapter) = self.adapters.get(source).cloned() else {
                continue;
            };
            let cache_key = Some(CacheKey::new(
                source.clone(),
                "fetch_delegations",
                format!("{}:{since}:{until}", protocol.id),
            ));
            let protocol_owned = protocol.clone();
            let call = move || {
                let adapter = adapter.clone();
                let protocol = protocol_owned.clone();
                async move { adapter.fetch_delegations(&protocol, since, until, deadline).await }
            };
            match self
                .call_with_retry::<Vec<adapters::raw::RawDelegation>, _, _>(source, "fetch_delegations", cache_key, ttl, call)
                .await
            {
                Ok((raw, tier)) => {
                    let batch = adapters::normalizer::normalize_delegations(raw);
                    if batch.meets_minimum() {
                        return Ok((batch.records, tier));
                    }
                    tracing::warn!(
                        source = %source,
                        survivor_share = batch.survivor_share(),
                        "delegation batch failed the survivor threshold, advancing fallback chain"
                    );
                    self.metrics.record_fallback();
                }
                Err(err) => {
                    tracing::warn!(source = %source, error = %err, "fetch_delegations failed, advancing fallback chain");
                    self.metrics.record_fallback();
                }
            }
        }
        Err(Self::chain_exhausted("delegations"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyHolderAdapter {
        id: SourceId,
        failures_then_success: AtomicU32,
    }

    #[async_trait]
    impl ProviderAdapter for FlakyHolderAdapter {
        fn source(&self) -> SourceId {
            self.id.clone()
        }

        async fn fetch_holders(
            &self,
            _protocol: &Protocol,
            _limit: usize,
            _cursor: Option<&str>,
            _deadline: Duration,
        ) -> Result<adapters::raw::HolderPage, GovError> {
            let attempt = self.failures_then_success.fetch_add(1, Ordering::SeqCst);
            if attempt < 2 {
                return Err(GovError::TransientUnavailable {
                    source: self.id.clone(),
                    reason: "simulated flake".to_string(),
                });
            }
            Ok(adapters::raw::HolderPage {
                holders: vec![adapters::raw::RawHolder {
                    address: "0x0000000000000000000000000000000000000001".to_string(),
                    balance: "100".to_string(),
                }],
                next_cursor: None,
            })
        }

        async fn fetch_proposals(
            &self,
            _protocol: &Protocol,
            _since: chrono::DateTime<chrono::Utc>,
            _until: chrono::DateTime<chrono::Utc>,
            _deadline: Duration,
        ) -> Result<Vec<adapters::raw::RawProposal>, GovError> {
            Err(adapters::not_supported(&self.id, "fetch_proposals"))
        }

        async fn fetch_votes(
            &self,
            _proposal: &ProposalRef,
            _deadline: Duration,
        ) -> Result<Vec<adapters::raw::RawVote>, GovError> {
            Err(adapters::not_supported(&self.id, "fetch_votes"))
        }

        async fn fetch_delegations(
            &self,
            _protocol: &Protocol,
            _since: chrono::DateTime<chrono::Utc>,
            _until: chrono::DateTime<chrono::Utc>,
            _deadline: Duration,
        ) -> Result<Vec<adapters::raw::RawDelegation>, GovError> {
            Err(adapters::not_supported(&self.id, "fetch_delegations"))
        }
    }

    fn test_protocol() -> Protocol {
        Protocol::new("lending-a", "Lending A", 18, 1_000_000, types::Address::ZERO)
    }

    #[tokio::test]
    async fn retries_a_flaky_source_until_it_succeeds() {
        let source = SourceId::new("flaky");
        let mut adapters: HashMap<SourceId, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(
            source.clone(),
            Arc::new(FlakyHolderAdapter {
                id: source.clone(),
                failures_then_success: AtomicU32::new(0),
            }),
        );
        let mut config = CoreConfig::default();
        config.retry.base_ms = 1;
        config.retry.ceiling_ms = 5;
        let coordinator = FetchCoordinator::new(adapters, &config);

        let (holders, tier) = coordinator
            .fetch_holders(&[source], &test_protocol(), 10, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(tier, ProvenanceTag::Live);
    }

    struct UnsupportedHolderAdapter {
        id: SourceId,
    }

    #[async_trait]
    impl ProviderAdapter for UnsupportedHolderAdapter {
        fn source(&self) -> SourceId {
            self.id.clone()
        }

        async fn fetch_holders(
            &self,
            _protocol: &Protocol,
            _limit: usize,
            _cursor: Option<&str>,
            _deadline: Duration,
        ) -> Result<adapters::raw::HolderPage, GovError> {
            Err(adapters::not_supported(&self.id, "fetch_holders"))
        }

        async fn fetch_proposals(
            &self,
            _protocol: &Protocol,
            _since: chrono::DateTime<chrono::Utc>,
            _until: chrono::DateTime<chrono::Utc>,
            _deadline: Duration,
        ) -> Result<Vec<adapters::raw::RawProposal>, GovError> {
            Err(adapters::not_supported(&self.id, "fetch_proposals"))
        }

        async fn fetch_votes(
            &self,
            _proposal: &ProposalRef,
            _deadline: Duration,
        ) -> Result<Vec<adapters::raw::RawVote>, GovError> {
            Err(adapters::not_supported(&self.id, "fetch_votes"))
        }

        async fn fetch_delegations(
            &self,
            _protocol: &Protocol,
            _since: chrono::DateTime<chrono::Utc>,
            _until: chrono::DateTime<chrono::Utc>,
            _deadline: Duration,
        ) -> Result<Vec<adapters::raw::RawDelegation>, GovError> {
            Err(adapters::not_supported(&self.id, "fetch_delegations"))
        }
    }

    #[tokio::test]
    async fn falls_back_to_the_next_source_when_the_first_is_unsupported() {
        let primary = SourceId::new("no-holders");
        let fallback = SourceId::new("flaky");
        let mut adapters: HashMap<SourceId, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(primary.clone(), Arc::new(UnsupportedHolderAdapter { id: primary.clone() }));
        adapters.insert(
            fallback.clone(),
            Arc::new(FlakyHolderAdapter {
                id: fallback.clone(),
                failures_then_success: AtomicU32::new(2),
            }),
        );
        let coordinator = FetchCoordinator::new(adapters, &CoreConfig::default());

        let (holders, _tier) = coordinator
            .fetch_holders(&[primary, fallback], &test_protocol(), 10, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(holders.len(), 1);
    }

    #[tokio::test]
    async fn exhausting_every_source_is_an_error() {
        let coordinator = FetchCoordinator::new(HashMap::new(), &CoreConfig::default());
        let err = coordinator
            .fetch_holders(&[SourceId::new("ghost")], &test_protocol(), 10, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GovError::TransientUnavailable { .. }));
    }
}
