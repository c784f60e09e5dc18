use crate::core::error::{RatesError, Result, RetryClass};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

/// Wait before the attempt following `attempt`: `base * 2^(attempt-1)` plus up
/// to 10% jitter.
pub fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let delay_ms = (base_delay.as_millis() as u64).saturating_mul(1u64 << exponent);
    let jitter_ms = if delay_ms >= 10 {
        rand::thread_rng().gen_range(0..=delay_ms / 10)
    } else {
        0
    };
    Duration::from_millis(delay_ms.saturating_add(jitter_ms))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Runs `operation` under this executor's policy.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with(operation, self.policy).await
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error or
    /// `policy.max_attempts` attempts have been made. The backoff wait is
    /// awaited in the caller's task before the next attempt starts.
    pub async fn execute_with<F, Fut, T>(&self, mut operation: F, policy: RetryPolicy) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!(attempt, max_attempts, "Executing operation attempt");
            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if err.retry_class() == RetryClass::Never {
                error!(attempt, error = %err, "Non-retryable error, aborting");
                return Err(RatesError::RetryExhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            if attempt >= max_attempts {
                error!(attempts = attempt, error = %err, "Operation failed after all retry attempts");
                return Err(RatesError::RetryExhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = backoff_delay(policy.base_delay, attempt);
            warn!(
                attempt,
                max_attempts,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "Attempt failed, will retry"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
