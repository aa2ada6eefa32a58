use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Backoff schedule for callers that choose to retry retryable failures.
///
/// Nothing in the subsystem retries on its own: the coordinator surfaces
/// `Conflict` when the row lock wait times out, and each caller decides
/// whether the operation is worth a second pass. Interactive paths pair
/// well with [`RetryPolicy::fast`]; background callers with
/// [`RetryPolicy::standard`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Ceiling on any single delay
    pub max_backoff: Duration,
    /// Growth factor applied per retry
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            multiplier,
        }
    }

    /// The initial attempt is the only attempt.
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO, 1.0)
    }

    /// Short schedule sized for row-lock contention on interactive paths:
    /// up to three quick retries within roughly a tenth of a second.
    pub fn fast() -> Self {
        Self::new(3, Duration::from_millis(10), Duration::from_millis(100), 2.0)
    }

    /// Patient schedule for background callers that can afford to wait out
    /// longer contention or a flaky downstream.
    pub fn standard() -> Self {
        Self::new(5, Duration::from_millis(100), Duration::from_secs(5), 2.0)
    }

    /// Delay before retry `attempt` (0-indexed), capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ms = (self.initial_backoff.as_millis() as f64 * self.multiplier.powi(attempt as i32))
            .min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(ms as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Run `operation`, retrying per `policy` while it fails with an error whose
/// `is_retryable()` is true. Non-retryable errors and exhaustion surface the
/// last error unchanged.
pub async fn retry_with_policy<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = match operation().await {
        Ok(value) => return Ok(value),
        Err(e) if e.is_retryable() => e,
        Err(e) => return Err(e),
    };

    for attempt in 0..policy.max_attempts {
        tokio::time::sleep(policy.backoff(attempt)).await;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => last_error = e,
            Err(e) => return Err(e),
        }
    }

    Err(last_error)
}
