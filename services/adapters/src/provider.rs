//! The capability trait every external data source implements (spec §4.1).
//!
//! `ProviderAdapter` replaces a plugin-registry/dynamic-dispatch architecture
//! with one sum-typeable trait object per source (spec §9 design note): new
//! sources are added by implementing this trait and appending to a fallback
//! chain in configuration, not by recompiling a central dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use types::{GovError, Protocol, ProposalRef, SourceId};

use crate::raw::{HolderPage, RawDelegation, RawProposal, RawVote};

/// Every adapter call carries a caller-supplied deadline (spec §4.1: "Adapters
/// never block indefinitely"). Adapters enforce it with `tokio::time::timeout`
/// around the underlying transport call.
pub type Deadline = Duration;

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The source id this adapter represents in configuration, provenance
    /// tags, and error context.
    fn source(&self) -> SourceId;

    async fn fetch_holders(
        &self,
        protocol: &Protocol,
        limit: usize,
        cursor: Option<&str>,
        deadline: Deadline,
    ) -> Result<HolderPage, GovError>;

    async fn fetch_proposals(
        &self,
        protocol: &Protocol,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<Vec<RawProposal>, GovError>;

    async fn fetch_votes(
        &self,
        proposal: &ProposalRef,
        deadline: Deadline,
    ) -> Result<Vec<RawVote>, GovError>;

    async fn fetch_delegations(
        &self,
        protocol: &Protocol,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<Vec<RawDelegation>, GovError>;
}

/// Standard `NotSupported` error for a capability a source's surface lacks
/// entirely (spec §4.1), e.g. `EthplorerAdapter`'s governance-data calls.
pub fn not_supported(source: &SourceId, call: &str) -> GovError {
    GovError::NotSupported {
        source: source.clone(),
        call: call.to_string(),
    }
}
