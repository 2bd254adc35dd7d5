//! # Provider Adapters, Fetch Coordination Primitives, and the Normalizer
//!
//! One [`ProviderAdapter`] implementation per external data source (spec
//! §4.1), plus the shared pieces the Fetch Coordinator (§4.2) composes them
//! with: a response cache, a per-source circuit breaker, token-bucket rate
//! limiting, and the schema-validating Normalizer (§4.3). The Coordinator
//! itself — retry/backoff, fallback-chain traversal, and the
//! degrade-to-simulated policy — lives in the `engine` crate, which depends
//! on this one.
//!
//! Every adapter is a stateless transformer: raw wire records in, canonical
//! [`raw`] records out. Rate limiting, circuit breaking, and caching are
//! state owned by the coordinator, not the adapter, so a new source is added
//! by implementing [`ProviderAdapter`] and appending to a fallback chain in
//! configuration (spec §9), never by touching this crate's other modules.

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod http;
pub mod normalizer;
pub mod provider;
pub mod raw;
pub mod rate_limit;
pub mod transfer_replay;

pub use adapters::{AlchemyAdapter, EtherscanAdapter, EthplorerAdapter, GraphAdapter, InfuraAdapter};
pub use cache::{CacheKey, ResponseCache};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitRegistry, CircuitState};
pub use provider::{not_supported, Deadline, ProviderAdapter};
pub use rate_limit::{RateLimitTracker, RateLimiter};
