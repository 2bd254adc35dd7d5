//! Protocol identity (spec §3). Immutable within a snapshot.

use serde::{Deserialize, Serialize};

use crate::address::Address;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProtocolId(pub String);

impl ProtocolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A governed protocol as of a particular snapshot: its token's decimals, total
/// supply, and the contract that mints it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: ProtocolId,
    pub name: String,
    pub decimals: u8,
    /// Total supply in base units, as of the snapshot timestamp.
    pub total_supply: u128,
    pub contract: Address,
}

impl Protocol {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        decimals: u8,
        total_supply: u128,
        contract: Address,
    ) -> Self {
        Self {
            id: ProtocolId::new(id),
            name: name.into(),
            decimals,
            total_supply,
            contract,
        }
    }
}

/// The three initial protocols this engine ships fallback-chain defaults for
/// (spec §1: "two lending protocols and one exchange protocol").
pub mod well_known {
    pub const LENDING_A: &str = "lending-a";
    pub const LENDING_B: &str = "lending-b";
    pub const EXCHANGE_A: &str = "exchange-a";
}
