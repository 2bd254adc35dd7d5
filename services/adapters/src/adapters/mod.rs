//! Concrete `ProviderAdapter` implementations, one per external source
//! (spec §4.1 [FULL]).

mod alchemy;
mod ethplorer;
mod etherscan;
mod graph;
mod infura;

pub use alchemy::AlchemyAdapter;
pub use ethplorer::EthplorerAdapter;
pub use etherscan::EtherscanAdapter;
pub use graph::GraphAdapter;
pub use infura::InfuraAdapter;
