//! # Governance Analytics Configuration
//!
//! The single configuration record (spec §6) the `Core` handle is built from:
//! API credentials, per-kind fallback chains, retry/backoff parameters,
//! concurrency caps, cache TTLs, the snapshot store backend, voting-block
//! discovery thresholds, and simulator parameters.
//!
//! Loaded with the `config` crate layered over a base TOML file and
//! `GOVLENS_*` environment variable overrides, following the same
//! `Config::builder().add_source(File).add_source(Environment)` pattern the
//! rest of this corpus uses for service configuration.

mod keys;

pub use keys::ApiKeysConfig;

use std::path::Path;

use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use types::SourceId;

/// A data kind the Fetch Coordinator acquires: one fallback chain and one
/// cache TTL exist per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Holders,
    Proposals,
    Votes,
    Delegations,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FallbackChainConfig {
    pub holders: Vec<String>,
    pub proposals: Vec<String>,
    pub votes: Vec<String>,
    pub delegations: Vec<String>,
}

impl FallbackChainConfig {
    pub fn chain_for(&self, kind: DataKind) -> Vec<SourceId> {
        let raw: &[String] = match kind {
            DataKind::Holders => &self.holders,
            DataKind::Proposals => &self.proposals,
            DataKind::Votes => &self.votes,
            DataKind::Delegations => &self.delegations,
        };
        raw.iter().map(|s| SourceId::new(s.clone())).collect()
    }
}

impl Default for FallbackChainConfig {
    fn default() -> Self {
        let default_chain = vec!["etherscan".into(), "alchemy".into(), "infura".into()];
        Self {
            holders: default_chain.clone(),
            proposals: vec!["graph".into()],
            votes: vec!["graph".into()],
            delegations: vec!["graph".into()],
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    pub base_ms: u64,
    pub ceiling_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_ms: 200,
            ceiling_ms: 30_000,
            max_attempts: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    pub per_source: usize,
    pub global: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            per_source: 4,
            global: 32,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    pub holders_ttl_s: u64,
    pub proposals_ttl_s: u64,
    pub votes_ttl_s: u64,
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn ttl_for(&self, kind: DataKind) -> u64 {
        match kind {
            DataKind::Holders => self.holders_ttl_s,
            DataKind::Proposals => self.proposals_ttl_s,
            DataKind::Votes => self.votes_ttl_s,
            DataKind::Delegations => self.proposals_ttl_s,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            holders_ttl_s: 300,
            proposals_ttl_s: 60,
            votes_ttl_s: 30,
            max_entries: 10_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Mem,
    Disk,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotStoreConfig {
    pub backend: StoreBackend,
    pub path: String,
}

impl Default for SnapshotStoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mem,
            path: "./snapshots".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct VotingBlocksConfig {
    pub min_overlap: u32,
    pub similarity_threshold: f64,
    /// Component size past which a second modularity-based pass may subdivide
    /// it (spec §4.7).
    pub large_component_split: usize,
}

impl Default for VotingBlocksConfig {
    fn default() -> Self {
        Self {
            min_overlap: 3,
            similarity_threshold: 0.8,
            large_component_split: 50,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub seed: u64,
    pub alpha: f64,
    pub dominant_share: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            alpha: 1.16,
            dominant_share: 0.6,
        }
    }
}

/// The full, deserializable configuration record (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
    #[serde(default)]
    pub fallback_chain: FallbackChainConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub snapshot_store: SnapshotStoreConfig,
    #[serde(default)]
    pub voting_blocks: VotingBlocksConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_keys: ApiKeysConfig::default(),
            fallback_chain: FallbackChainConfig::default(),
            retry: RetryConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            cache: CacheConfig::default(),
            snapshot_store: SnapshotStoreConfig::default(),
            voting_blocks: VotingBlocksConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Load configuration from an optional base TOML file, overridden by
    /// `GOVLENS_*` environment variables (double-underscore separated for
    /// nested keys, e.g. `GOVLENS_RETRY__MAX_ATTEMPTS`).
    pub fn load(base_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = base_path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("GOVLENS")
                .separator("__")
                .try_parsing(true),
        );
        let config = builder.build().context("failed to build configuration")?;
        config
            .try_deserialize()
            .context("failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.voting_blocks.min_overlap, 3);
        assert!((cfg.voting_blocks.similarity_threshold - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn loads_and_overrides_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("govlens.toml");
        fs::write(
            &path,
            r#"
[retry]
base_ms = 500
ceiling_ms = 60000
max_attempts = 8

[api_keys]
etherscan = "abc123"
"#,
        )
        .unwrap();

        let cfg = CoreConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.retry.max_attempts, 8);
        assert_eq!(cfg.api_keys.etherscan.as_deref(), Some("abc123"));
        // unset sections fall back to their serde defaults
        assert_eq!(cfg.voting_blocks.min_overlap, 3);
    }

    #[test]
    fn fallback_chain_maps_to_source_ids() {
        let cfg = FallbackChainConfig::default();
        let chain = cfg.chain_for(DataKind::Holders);
        assert_eq!(chain[0], SourceId::new("etherscan"));
    }
}
