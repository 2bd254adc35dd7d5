//! Protocol registry and adapter construction.
//!
//! The data model (spec §3) treats a [`Protocol`] as an immutable identity
//! record — decimals, total supply, contract address — that no adapter
//! fetches; it is deployment configuration, the same way Torq's instrument
//! registry is configuration rather than a venue response. This module is the
//! engine's analogue: a small built-in table of the three protocols spec §1
//! opens with, and the one place that turns `CoreConfig`'s API credentials
//! into live [`ProviderAdapter`] instances.

use std::collections::HashMap;
use std::sync::Arc;

use adapters::{AlchemyAdapter, EtherscanAdapter, EthplorerAdapter, GraphAdapter, InfuraAdapter, ProviderAdapter};
use config::ApiKeysConfig;
use types::{Address, Protocol, ProtocolId};

/// Default public endpoints for each source. Not currently exposed through
/// `CoreConfig` (see DESIGN.md) — override by constructing adapters directly
/// and calling [`FetchCoordinator::register`](crate::coordinator::FetchCoordinator::register)
/// instead of [`build_default_adapters`] when a deployment needs non-default
/// endpoints.
mod endpoints {
    pub const ETHERSCAN: &str = "https://api.etherscan.io/api";
    pub const GRAPH: &str = "https://api.thegraph.com/subgraphs/name/governance";
    pub const ALCHEMY: &str = "https://eth-mainnet.g.alchemy.com/v2";
    pub const INFURA: &str = "https://mainnet.infura.io/v3";
    pub const ETHPLORER: &str = "https://api.ethplorer.io";
}

/// Construct one adapter per known source, wired to its configured API key.
/// Sources without a configured key are still constructed — `AuthMissing`
/// surfaces lazily on first call (spec §4.1) so the fallback chain can skip
/// past them without the registry needing to know which kinds need which
/// credentials.
pub fn build_default_adapters(api_keys: &ApiKeysConfig) -> HashMap<types::SourceId, Arc<dyn ProviderAdapter>> {
    let mut adapters: HashMap<types::SourceId, Arc<dyn ProviderAdapter>> = HashMap::new();
    adapters.insert(
        types::SourceId::new("etherscan"),
        Arc::new(EtherscanAdapter::new(endpoints::ETHERSCAN, api_keys.for_source("etherscan").map(str::to_string))),
    );
    adapters.insert(
        types::SourceId::new("graph"),
        Arc::new(GraphAdapter::new(endpoints::GRAPH, api_keys.for_source("graph").map(str::to_string))),
    );
    adapters.insert(
        types::SourceId::new("alchemy"),
        Arc::new(AlchemyAdapter::new(endpoints::ALCHEMY, api_keys.for_source("alchemy").map(str::to_string))),
    );
    adapters.insert(
        types::SourceId::new("infura"),
        Arc::new(InfuraAdapter::new(endpoints::INFURA, api_keys.for_source("infura").map(str::to_string))),
    );
    adapters.insert(
        types::SourceId::new("ethplorer"),
        Arc::new(EthplorerAdapter::new(endpoints::ETHPLORER, api_keys.for_source("ethplorer").map(str::to_string))),
    );
    adapters
}

/// The protocols this engine ships defaults for (spec §1: "initially three:
/// two lending protocols and one exchange protocol"). Contract addresses
/// below are placeholders — a real deployment overrides this table entirely
/// (see DESIGN.md).
#[derive(Clone, Debug, Default)]
pub struct ProtocolRegistry {
    protocols: HashMap<ProtocolId, Protocol>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, protocol: Protocol) {
        self.protocols.insert(protocol.id.clone(), protocol);
    }

    pub fn get(&self, id: &ProtocolId) -> Option<&Protocol> {
        self.protocols.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Protocol> {
        self.protocols.values()
    }
}

impl FromIterator<Protocol> for ProtocolRegistry {
    fn from_iter<I: IntoIterator<Item = Protocol>>(iter: I) -> Self {
        let mut registry = Self::new();
        for p in iter {
            registry.insert(p);
        }
        registry
    }
}

/// The built-in three-protocol registry (spec §1).
pub fn default_registry() -> ProtocolRegistry {
    [
        Protocol::new(
            types::protocol::well_known::LENDING_A,
            "Lending Protocol A",
            18,
            1_000_000_000_000_000_000_000_000_000,
            Address([0x01; 20]),
        ),
        Protocol::new(
            types::protocol::well_known::LENDING_B,
            "Lending Protocol B",
            18,
            500_000_000_000_000_000_000_000_000,
            Address([0x02; 20]),
        ),
        Protocol::new(
            types::protocol::well_known::EXCHANGE_A,
            "Exchange Protocol A",
            18,
            250_000_000_000_000_000_000_000_000,
            Address([0x03; 20]),
        ),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_the_three_initial_protocols() {
        let registry = default_registry();
        assert!(registry.get(&ProtocolId::new("lending-a")).is_some());
        assert!(registry.get(&ProtocolId::new("lending-b")).is_some());
        assert!(registry.get(&ProtocolId::new("exchange-a")).is_some());
        assert_eq!(registry.all().count(), 3);
    }

    #[test]
    fn adapters_are_constructed_for_every_known_source() {
        let adapters = build_default_adapters(&ApiKeysConfig::default());
        for source in ["etherscan", "graph", "alchemy", "infura", "ethplorer"] {
            assert!(adapters.contains_key(&types::SourceId::new(source)));
        }
    }
}
