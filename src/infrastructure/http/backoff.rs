//! Retry decorator for image fetchers.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::domain::cancel::CancelSignal;
use crate::domain::entities::{FetchTask, ImageTag};
use crate::domain::errors::InlineError;
use crate::domain::ports::ImageFetcher;

/// Delay before the first retry.
pub const RETRY_DELAY_INITIAL: Duration = Duration::from_millis(100);
/// Longest single delay.
pub const RETRY_DELAY_MAX: Duration = Duration::from_secs(2);
/// Total retry budget.
pub const RETRY_ELAPSED_MAX: Duration = Duration::from_secs(10);
/// Growth factor between delays.
pub const RETRY_MULTIPLIER: f64 = 2.0;

/// Exponential backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Upper bound for a single delay.
    pub max_interval: Duration,
    /// Total time after which the last failure is returned.
    pub max_elapsed: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval: RETRY_DELAY_INITIAL,
            multiplier: RETRY_MULTIPLIER,
            max_interval: RETRY_DELAY_MAX,
            max_elapsed: RETRY_ELAPSED_MAX,
        }
    }
}

impl BackoffPolicy {
    /// Returns the delay to wait before retry number `attempt` (zero-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);

        Duration::try_from_secs_f64(self.initial_interval.as_secs_f64() * factor)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// Retries the wrapped fetcher while the upstream answers with 5xx.
///
/// Any other failure is returned at once. Retry state lives in each call.
#[derive(Debug, Clone)]
pub struct BackoffFetcher<F> {
    inner: F,
    policy: BackoffPolicy,
}

impl<F> BackoffFetcher<F> {
    /// Wraps `inner` with `policy`.
    #[must_use]
    pub const fn new(inner: F, policy: BackoffPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<F> ImageFetcher for BackoffFetcher<F>
where
    F: ImageFetcher,
{
    async fn fetch(&self, task: FetchTask, cancel: CancelSignal) -> Result<ImageTag, InlineError> {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let error = match self.inner.fetch(task.clone(), cancel.clone()).await {
                Ok(image) => return Ok(image),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            let delay = self.policy.delay_for(attempt);
            if started.elapsed() + delay > self.policy.max_elapsed {
                warn!(
                    url = %task.url(),
                    attempts = attempt + 1,
                    error = %error,
                    "Giving up on image after repeated server errors"
                );
                return Err(error);
            }

            debug!(
                url = %task.url(),
                attempt = attempt + 1,
                delay_ms = delay.as_millis(),
                "Retrying image after server error"
            );

            if cancel.run(sleep(delay)).await.is_none() {
                return Err(InlineError::cancelled(format!(
                    "waiting to retry {}",
                    task.url()
                )));
            }
            attempt += 1;
        }
    }
}
