//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound upstream connection establishment
//! - Cancel the wrapped operation cleanly on expiry
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from the operation's own errors

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Outcome of a deadline-bounded operation that did not succeed.
#[derive(Debug, Error)]
pub enum DeadlineError<E> {
    #[error("timed out after {0:?}")]
    Elapsed(Duration),

    #[error(transparent)]
    Inner(E),
}

/// Run `operation`, giving up after `limit`. The future is dropped on expiry.
pub async fn with_deadline<F, T, E>(limit: Duration, operation: F) -> Result<T, DeadlineError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DeadlineError::Inner(e)),
        Err(_) => Err(DeadlineError::Elapsed(limit)),
    }
}
