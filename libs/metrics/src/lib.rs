//! # Concentration and Participation Metrics
//!
//! Pure functions over a normalized [`types::Snapshot`]: holder concentration
//! (spec §4.5) and governance participation (spec §4.6). Every function here is
//! total — degenerate inputs (empty sets, zero supply) return defined sentinel
//! values, never a panic or an error.

pub mod concentration;
pub mod participation;

pub use concentration::compute_concentration;
pub use participation::compute_participation;
