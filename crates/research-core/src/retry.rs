//! Retry logic with exponential backoff for adapter calls
//!
//! Only transient upstream failures are retried. Timeouts, missing symbols and
//! malformed responses are returned to the caller immediately. The aggregator
//! wraps the whole retry loop in the adapter's timeout, so retries never
//! extend an adapter's time budget.

use crate::model::{ErrorKind, ProviderFailure, ProviderResult};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,

    /// Initial backoff duration
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,

    /// Backoff multiplier (typically 2.0 for exponential backoff)
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            backoff_multiplier,
        }
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Create a policy with fast retries (for testing)
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        }
    }

    /// Calculate backoff duration for a given attempt
    fn backoff_duration(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let backoff_ms =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);

        Duration::from_millis(backoff_ms as u64).min(self.max_backoff)
    }

    /// Check if a failure is worth another attempt
    fn is_retryable(failure: &ProviderFailure) -> bool {
        failure.kind == ErrorKind::UpstreamError
    }

    /// Execute an adapter call with retry logic
    ///
    /// Returns the first success, the first non-retryable failure, or the
    /// last failure once all attempts are spent.
    pub async fn execute<F, Fut, T>(&self, provider: &str, mut operation: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("Attempt {}/{} for provider: {}", attempt, attempts, provider);

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Provider '{}' succeeded after {} retries", provider, attempt - 1);
                    }
                    return Ok(value);
                }
                Err(failure) if !Self::is_retryable(&failure) || attempt >= attempts => {
                    if attempt > 1 {
                        warn!(
                            "Provider '{}' failed after {} attempts: {}",
                            provider, attempt, failure
                        );
                    }
                    return Err(failure);
                }
                Err(failure) => {
                    let backoff = self.backoff_duration(attempt);
                    warn!(
                        "Provider '{}' failed (attempt {}/{}): {}. Retrying in {:?}",
                        provider, attempt, attempts, failure, backoff
                    );
                    sleep(backoff).await;
                }
            }
        }
    }
}
