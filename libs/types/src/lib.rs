//! # Canonical Governance Data Model
//!
//! Shared type definitions for the governance analytics engine: the normalized
//! on-chain records (holders, proposals, votes, delegations), the snapshot that
//! bundles them, the derived analytical results attached to a snapshot, and the
//! closed error taxonomy every other crate in the workspace propagates.
//!
//! This crate has no dependency on any other workspace crate — every analytical
//! and I/O crate (`metrics`, `graph`, `simulator`, `store`, `adapters`, `engine`)
//! depends on it, never the reverse.

pub mod address;
pub mod concentration;
pub mod delegation;
pub mod error;
pub mod holder;
pub mod participation;
pub mod proposal;
pub mod protocol;
pub mod provenance;
pub mod snapshot;
pub mod source;
pub mod vote;
pub mod voting_block;

pub use address::Address;
pub use concentration::ConcentrationMetrics;
pub use delegation::{Delegation, DelegationAmount};
pub use error::GovError;
pub use holder::{rank_holders, total_balance, HolderBalance};
pub use participation::{HolderBucket, ParticipationMetrics, WhaleBehavior};
pub use proposal::{Proposal, ProposalStatus, Tallies};
pub use protocol::{Protocol, ProtocolId};
pub use provenance::ProvenanceTag;
pub use snapshot::{Snapshot, SnapshotMetrics};
pub use source::SourceId;
pub use vote::{Choice, ProposalRef, Vote};
pub use voting_block::{Anomaly, AnomalyCategory, AnomalyReference, VotingBlock};

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, GovError>;
