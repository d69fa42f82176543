//! Bounded-time retry for calls against eventually consistent APIs
//!
//! A remote call is classified after every attempt: success and fatal
//! failures return immediately, retryable failures sleep and try again until
//! the policy's timeout elapses. Which vendor codes are retryable is decided
//! per call site.

use crate::error::{CloudError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Outcome of a single remote attempt
#[derive(Debug)]
pub enum RetryableOutcome<T> {
    Success(T),
    Retryable(CloudError),
    Fatal(CloudError),
}

impl<T> RetryableOutcome<T> {
    /// Classify a plain result with a caller-supplied predicate
    pub fn classify<P>(result: Result<T>, is_retryable: P) -> Self
    where
        P: Fn(&CloudError) -> bool,
    {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) if is_retryable(&e) => Self::Retryable(e),
            Err(e) => Self::Fatal(e),
        }
    }
}

/// Retry configuration for provider operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum wall-clock time spent retrying
    pub timeout: Duration,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound for a single delay
    pub max_delay: Duration,

    /// Backoff multiplier (1.0 keeps the interval fixed)
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 1.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_backoff(mut self, multiplier: f64, max_delay: Duration) -> Self {
        self.backoff_multiplier = multiplier;
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after the given (zero-based) failed attempt.
    ///
    /// Growth saturates at `max_delay`, however many attempts were made.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let cap = self.max_delay.max(self.initial_delay);
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .map_or(cap, |delay| delay.min(cap))
    }

    /// Run `op` until it succeeds, fails fatally or the timeout elapses.
    ///
    /// The deadline is checked after each attempt; an in-flight call is never
    /// interrupted. On timeout the last retryable reason is carried in
    /// [`CloudError::Timeout`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RetryableOutcome<T>>,
    {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let reason = match op().await {
                RetryableOutcome::Success(value) => return Ok(value),
                RetryableOutcome::Fatal(e) => return Err(e),
                RetryableOutcome::Retryable(e) => e,
            };

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                tracing::warn!(
                    "{} gave up after {} attempts ({:?}): {}",
                    operation,
                    attempt + 1,
                    elapsed,
                    reason
                );
                return Err(CloudError::timeout(operation, reason));
            }

            let delay = self
                .delay_for_attempt(attempt)
                .min(self.timeout - elapsed);
            tracing::debug!(
                "{} attempt {} failed, retrying in {:?}: {}",
                operation,
                attempt + 1,
                delay,
                reason
            );
            attempt += 1;
            sleep(delay).await;
        }
    }

    /// Run a plain fallible call, retrying errors accepted by `is_retryable`
    pub async fn run_classified<T, P, F, Fut>(
        &self,
        operation: &str,
        is_retryable: P,
        mut op: F,
    ) -> Result<T>
    where
        P: Fn(&CloudError) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let is_retryable = &is_retryable;
        self.run(operation, || {
            let fut = op();
            async move { RetryableOutcome::classify(fut.await, is_retryable) }
        })
        .await
    }
}
