//! # Voting-Block Analyzer
//!
//! Co-voting graph construction, connected-component block discovery, and
//! anomaly detection over a normalized [`types::Snapshot`] (spec §4.7). Like
//! `metrics`, every entry point here is a pure function over already-fetched
//! data; no I/O happens in this crate.

mod anomalies;
mod blocks;
mod union_find;

pub use anomalies::detect_anomalies;
pub use blocks::analyze_voting_blocks;
