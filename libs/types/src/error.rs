//! Closed error taxonomy (spec §7) shared by every crate in the workspace.
//!
//! Every fallible operation in the core returns a [`GovError`] (or the workspace
//! [`crate::Result`] alias). Variants carry structured context rather than bare
//! strings wherever the caller would plausibly need it — a fingerprint to
//! reproduce a schema failure, a venue id to know which source to blame, a
//! server-suggested delay to honor on the next retry.

use std::time::Duration;

use thiserror::Error;

use crate::source::SourceId;

#[derive(Debug, Error)]
pub enum GovError {
    /// Source returned a retryable failure (§7: retried locally; surfaced only on
    /// exhaustion of retries and fallbacks).
    #[error("source {source} temporarily unavailable: {reason}")]
    TransientUnavailable { source: SourceId, reason: String },

    /// Source signaled throttling, optionally with a suggested retry delay.
    #[error("source {source} rate limited{}", retry_after.map(|d| format!(" (retry after {d:?})")).unwrap_or_default())]
    RateLimited {
        source: SourceId,
        retry_after: Option<Duration>,
    },

    /// Required credential absent for this source.
    #[error("source {source} has no credential configured")]
    AuthMissing { source: SourceId },

    /// Response violated the normalizer's schema contract after decode.
    #[error("source {source} produced a schema violation for {call}: {fingerprint}")]
    PermanentSchema {
        source: SourceId,
        call: String,
        fingerprint: String,
    },

    /// Source lacks this capability entirely (e.g. a holder-index-less source
    /// asked for proposals).
    #[error("source {source} does not support {call}")]
    NotSupported { source: SourceId, call: String },

    /// Caller input invalid; never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Deadline exceeded or caller cancelled.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// Snapshot store backend error; retried once before surfacing.
    #[error("storage error: {0}")]
    StorageIo(String),

    /// Invariant violation. Surfaced immediately; the process keeps running.
    #[error("internal error: {0}")]
    Internal(String),

    /// JSON (de)serialization failure at a provider boundary.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport failure at a provider boundary (connect, TLS, decode).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem failure, distinct from [`GovError::StorageIo`] in that it
    /// carries the original `io::Error` rather than a pre-rendered string.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Escape hatch for internal glue that never crosses the public API boundary.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GovError {
    /// Whether this error is worth a retry within the same source.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GovError::TransientUnavailable { .. } | GovError::RateLimited { .. }
        )
    }

    /// Whether the Fetch Coordinator should advance past this source entirely
    /// rather than retry it.
    pub fn skips_source(&self) -> bool {
        matches!(
            self,
            GovError::AuthMissing { .. }
                | GovError::NotSupported { .. }
                | GovError::PermanentSchema { .. }
        )
    }

    pub fn source(&self) -> Option<&SourceId> {
        match self {
            GovError::TransientUnavailable { source, .. }
            | GovError::RateLimited { source, .. }
            | GovError::AuthMissing { source }
            | GovError::PermanentSchema { source, .. }
            | GovError::NotSupported { source, .. } => Some(source),
            _ => None,
        }
    }
}
