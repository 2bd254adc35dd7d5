//! API credentials (spec §6). Values are opaque strings sourced from
//! configuration or environment; this crate never reads a credentials file
//! itself — that remains the out-of-scope "API-key file loading" collaborator
//! (spec §1).

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub etherscan: Option<String>,
    pub graph: Option<String>,
    pub alchemy: Option<String>,
    pub infura: Option<String>,
    pub ethplorer: Option<String>,
}

impl ApiKeysConfig {
    pub fn for_source(&self, source: &str) -> Option<&str> {
        match source {
            "etherscan" => self.etherscan.as_deref(),
            "graph" => self.graph.as_deref(),
            "alchemy" => self.alchemy.as_deref(),
            "infura" => self.infura.as_deref(),
            "ethplorer" => self.ethplorer.as_deref(),
            _ => None,
        }
    }
}
