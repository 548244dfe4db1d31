//! Retry utilities with a fixed delay between attempts
//!
//! Attempts run strictly one after another. The wait between failed
//! attempts is a `tokio::time::sleep`, so a slow retry loop only suspends
//! the request that owns it.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one (at least 1)
    pub max_attempts: u32,

    /// Wait between two failed attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Set the total number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay between attempts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// A single attempt, no waiting
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Attempts actually made per target; a zero setting still makes one call
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Result of a retry operation
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or last error)
    pub result: Result<T, E>,

    /// Number of attempts made
    pub attempts: u32,
}

/// Execute an async operation until it succeeds, fails with a
/// non-retryable error, or runs out of attempts.
///
/// `on_failure` is invoked with the 1-based attempt number after every
/// failed attempt, before any wait.
pub async fn retry_with_delay<T, E, F, Fut, R, L>(
    policy: &RetryPolicy,
    is_retryable: R,
    mut on_failure: L,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    L: FnMut(u32, &E),
{
    let max_attempts = policy.effective_attempts();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(err) => {
                on_failure(attempts, &err);

                if attempts >= max_attempts || !is_retryable(&err) {
                    return RetryResult {
                        result: Err(err),
                        attempts,
                    };
                }

                if !policy.delay.is_zero() {
                    tracing::debug!(
                        attempt = attempts,
                        delay_ms = policy.delay.as_millis() as u64,
                        "Waiting before next attempt"
                    );
                    sleep(policy.delay).await;
                }
            }
        }
    }
}
