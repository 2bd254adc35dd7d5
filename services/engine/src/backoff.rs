//! Exponential backoff with jitter for in-source retries (spec §4.2).
//!
//! `delay = base * 2^attempt`, capped at `ceiling`, then scaled by a uniform
//! factor in `[0.5, 1.5]`. A server-suggested `Retry-After` delay (from
//! [`types::GovError::RateLimited`]) overrides the computed value entirely.

use std::time::Duration;

use rand::Rng;

/// Compute the backoff delay for the given zero-based retry attempt.
pub fn compute_delay(base: Duration, ceiling: Duration, attempt: u32) -> Duration {
    let exp = 2u64.saturating_pow(attempt.min(32));
    let scaled = base.saturating_mul(exp as u32).min(ceiling);
    jitter(scaled)
}

fn jitter(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.5..=1.5);
    Duration::from_secs_f64(delay.as_secs_f64() * factor)
}
