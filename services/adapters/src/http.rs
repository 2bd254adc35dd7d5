//! Small shared helpers every HTTP-backed adapter uses: deadline enforcement
//! and uniform error mapping from `reqwest` failures onto the closed taxonomy
//! (spec §4.1, §7).

use std::future::Future;
use std::time::Duration;

use types::{GovError, SourceId};

/// Race `fut` against `deadline`, mapping a timeout onto `TransientUnavailable`
/// so it participates in the Fetch Coordinator's ordinary retry accounting
/// rather than surfacing as a distinct error family.
pub async fn with_deadline<F, T>(source: &SourceId, deadline: Duration, fut: F) -> Result<T, GovError>
where
    F: Future<Output = Result<T, GovError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(GovError::TransientUnavailable {
            source: source.clone(),
            reason: format!("deadline of {deadline:?} exceeded"),
        }),
    }
}

/// Map a transport-level failure onto the closed taxonomy. Connection resets,
/// DNS failures, and TLS errors are treated as transient; an HTTP 429 with a
/// `Retry-After` header is rate limiting; anything else transient.
pub fn map_transport_error(source: &SourceId, err: reqwest::Error) -> GovError {
    if let Some(status) = err.status() {
        if status.as_u16() == 429 {
            return GovError::RateLimited {
                source: source.clone(),
                retry_after: None,
            };
        }
        if status.is_client_error() {
            return GovError::PermanentSchema {
                source: source.clone(),
                call: "http".to_string(),
                fingerprint: status.to_string(),
            };
        }
    }
    GovError::TransientUnavailable {
        source: source.clone(),
        reason: err.to_string(),
    }
}
