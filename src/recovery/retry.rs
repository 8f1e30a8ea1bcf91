//! Bounded retry for remote reads.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Errors that can signal "the object does not exist yet"
pub trait ReadFailure: Display {
    fn is_not_found(&self) -> bool;
}

impl ReadFailure for crate::storage::StoreError {
    fn is_not_found(&self) -> bool {
        crate::storage::StoreError::is_not_found(self)
    }
}

/// Retries an operation a fixed number of times.
///
/// A not-found failure is not retried: it short-circuits to `Ok(None)`. Any other
/// failure is retried until `max_attempts` is reached, then the last error is
/// returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::constants::defaults::EVENT_LOG_READ_ATTEMPTS, Duration::ZERO)
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn execute<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<Option<T>, E>
    where
        E: ReadFailure,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(Some(value)),
                Err(err) if err.is_not_found() => return Ok(None),
                Err(err) if attempt >= self.max_attempts => {
                    warn!(
                        operation = %operation,
                        attempts = attempt,
                        error = %err,
                        "Giving up after exhausting retries"
                    );
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        operation = %operation,
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Exception while attempting remote read, retrying"
                    );
                    attempt += 1;
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }
    }
}
