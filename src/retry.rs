//! Retry with exponential backoff and a per-attempt timeout.
//!
//! Every external call (autocomplete endpoint, LLM endpoint, volume API) goes
//! through [`RetryPolicy::run`].

use std::future::Future;
use std::time::Duration;

/// Errors that the retry wrapper knows how to classify
pub trait Transient: std::fmt::Display {
    /// Whether another attempt could succeed
    fn is_transient(&self) -> bool;

    /// Error reported when one attempt exceeds the policy timeout
    fn timed_out(after: Duration) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each later one
    pub base_delay: Duration,
    /// Timeout applied to each attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn once(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            timeout,
        }
    }

    /// Backoff before attempt `attempt + 1` (attempts are 1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }

    /// Run `op` until it succeeds, returns a non-transient error, or attempts
    /// are exhausted. The last error is returned.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Transient,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        tracing::debug!(label = %label, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(e)) => e,
                Err(_) => E::timed_out(self.timeout),
            };

            if !err.is_transient() || attempt >= max_attempts {
                tracing::warn!(
                    label = %label,
                    attempt,
                    max_attempts,
                    error = %err,
                    "giving up"
                );
                return Err(err);
            }

            let wait = self.backoff(attempt);
            tracing::debug!(
                label = %label,
                attempt,
                max_attempts,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "attempt failed, retrying"
            );
            tokio::time::sleep(wait).await;
        }
    }
}
