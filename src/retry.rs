//! Fixed-count, fixed-delay retry policy.
//!
//! Both the broker connection and the dashboard's report fetch retry the same
//! way: a bounded number of attempts with a constant pause in between and no
//! backoff growth. [`RetryPolicy::run`] is the single implementation of that
//! loop; call sites only supply the operation and a retryable-error predicate.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`RetryPolicy::run`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// An attempt failed with an error the predicate refused to retry.
    #[error("{0}")]
    Aborted(E),
}

impl<E> RetryError<E> {
    /// The error from the final attempt.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Aborted(e) => e,
        }
    }
}

/// Bounded retry with a constant delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy. A `max_attempts` of zero still runs the operation once.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Broker connection policy: 5 attempts, 2 seconds apart.
    pub fn broker_connect() -> Self {
        Self::new(5, Duration::from_secs(2))
    }

    /// Consumer report fetch policy: 5 attempts, 10 seconds apart.
    pub fn report_fetch() -> Self {
        Self::new(5, Duration::from_secs(10))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. Sleeps `delay` between attempts, never after
    /// the last one.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, is_retryable: P) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !is_retryable(&e) => {
                    tracing::warn!(attempt, error = %e, "Operation failed, not retryable");
                    return Err(RetryError::Aborted(e));
                }
                Err(e) if attempt >= self.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Operation failed, no attempts left"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
