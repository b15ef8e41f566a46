//! Retry logic.
//!
//! # Responsibilities
//! - Hold the process-wide retry bound and per-attempt timeout
//! - Re-run a failed attempt until it succeeds or the bound is reached
//!
//! # Design Decisions
//! - Iterative loop with an explicit attempt counter
//! - Attempts are strictly sequential; attempt N+1 starts after N has failed
//! - No backoff delay between attempts
//! - Every call starts its own counter; there is no cross-request budget

use std::future::Future;
use std::time::Duration;

use crate::config::{RetryConfig, UpstreamConfig};
use crate::observability::metrics;

/// Immutable retry bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Deadline for each individual attempt.
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_retries,
            attempt_timeout,
        }
    }

    pub fn from_config(retries: &RetryConfig, upstream: &UpstreamConfig) -> Self {
        Self::new(
            retries.max_retries,
            Duration::from_millis(upstream.timeout_ms),
        )
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default(), &UpstreamConfig::default())
    }
}

/// The last error once every attempt failed.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub error: E,
    pub attempts: u32,
}

/// Run `op` until it returns `Ok` or `policy.max_attempts()` attempts have failed.
///
/// `op` receives the 1-based attempt number. An error for which `retryable`
/// returns `false` ends the loop immediately.
pub async fn retry<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    mut op: F,
    retryable: R,
) -> Result<T, Exhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts && retryable(&error) => {
                tracing::info!(
                    attempt,
                    max_attempts,
                    error = %error,
                    "Retrying upstream request"
                );
                metrics::record_retry();
            }
            Err(error) => {
                return Err(Exhausted {
                    error,
                    attempts: attempt,
                })
            }
        }
    }
}
