//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap a single upstream attempt with a deadline
//! - Keep timeout failures distinct from transport failures
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - The deadline bounds one attempt, never the whole retry sequence

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Why a single attempt produced no usable response.
#[derive(Debug, Error)]
pub enum AttemptError<E> {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("{0}")]
    Failed(E),
}

/// Run `fut`, giving up after `deadline`.
pub async fn with_timeout<F, T, E>(deadline: Duration, fut: F) -> Result<T, AttemptError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(AttemptError::Failed(e)),
        Err(_) => Err(AttemptError::TimedOut(deadline)),
    }
}
