//! Retry executor with exponential backoff
//!
//! Wraps a fallible async operation and re-invokes it on transient failures.
//! What counts as transient is decided by a [`RetryPolicy`], so retry
//! behavior is visible and testable at each call site instead of hidden in
//! the operation itself.
//!
//! The executor never wraps errors: on a non-retryable failure or after the
//! attempt budget is spent, the caller gets the last error exactly as the
//! operation produced it.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Decision for whether to retry a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the next backoff delay.
    Retry,
    /// Surface the error immediately.
    Stop,
}

/// Determines whether an error is worth retrying.
pub trait RetryPolicy<E> {
    fn classify(&self, error: &E) -> RetryDecision;
}

/// Configuration for retry behavior.
///
/// `max_retries` counts *additional* attempts after the first one: the
/// default of 3 means up to 4 calls total. Delays follow
/// `base_delay * 2^attempt` (attempt starting at 0), so the defaults sleep
/// 0.5 s, 1 s, 2 s between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_millis(500) }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Delay before the retry following failed attempt `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        // Shift is capped so absurd attempt counts saturate instead of
        // overflowing; unreachable with any sane max_retries.
        let multiplier = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(multiplier)
    }
}

/// Drives an operation through attempts according to a config and policy.
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> RetryConfig {
        self.config
    }

    /// Execute `operation`, retrying transient failures with backoff.
    ///
    /// Attempt 0 runs immediately. A failure the policy classifies as
    /// retryable sleeps `base_delay * 2^attempt` and tries again, up to
    /// `max_retries` additional attempts. Non-retryable failures and the
    /// last exhausted attempt return the error unchanged.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if attempt >= self.config.max_retries {
                        warn!(
                            attempts = attempt + 1,
                            error = %error,
                            "retry budget exhausted"
                        );
                        return Err(error);
                    }

                    match self.policy.classify(&error) {
                        RetryDecision::Stop => {
                            debug!(error = %error, "error is not retryable");
                            return Err(error);
                        }
                        RetryDecision::Retry => {
                            let delay = self.config.backoff_delay(attempt);
                            warn!(
                                attempt = attempt + 1,
                                delay_ms = delay.as_millis() as u64,
                                error = %error,
                                "transient failure, retrying after backoff"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                    }
                }
            }
        }
    }
}

/// Stock policies for tests and simple call sites.
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Retries on any error.
    #[derive(Debug, Clone, Copy)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn classify(&self, _error: &E) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retries.
    #[derive(Debug, Clone, Copy)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn classify(&self, _error: &E) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Retries when the predicate returns true for the error.
    #[derive(Debug)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E) -> bool,
    {
        fn classify(&self, error: &E) -> RetryDecision {
            if (self.predicate)(error) { RetryDecision::Retry } else { RetryDecision::Stop }
        }
    }
}
