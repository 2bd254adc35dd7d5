//! # Governance Simulator
//!
//! Deterministic synthetic holder distributions and governance activity
//! (spec §4.4), used both by the Fetch Coordinator as a last-resort fallback
//! tier and directly by tests and benchmarks that need reproducible data
//! without live network access.
//!
//! Every generator is seeded by a caller-provided `u64`; identical seed and
//! parameters always produce bit-identical output (spec §8, invariant 8).

mod governance;
mod holders;
mod rng;

pub use governance::{simulate_proposals, ChoiceProfile};
pub use holders::{community, power_law, protocol_dominated};

/// The three holder-distribution profiles this crate generates (spec §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    PowerLaw,
    ProtocolDominated,
    Community,
}

/// Generate a holder set under the named profile, using the given
/// configuration's `alpha` and `dominant_share` where relevant.
pub fn generate_holders(
    profile: Profile,
    n: usize,
    supply: u128,
    config: &config::SimulatorConfig,
) -> Vec<types::HolderBalance> {
    match profile {
        Profile::PowerLaw => power_law(n, config.alpha, supply, config.seed),
        Profile::ProtocolDominated => {
            protocol_dominated(n, config.alpha, config.dominant_share, supply, config.seed)
        }
        Profile::Community => community(n, supply, config.seed),
    }
}
