//! Retry policy for transient fetch and store failures.
//!
//! Delays grow with the attempt number and are capped, so a retrying job
//! never waits unboundedly and never blocks other jobs.

use std::future::Future;
use std::time::Duration;

use crate::error::{FetchError, StoreError};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffGrowth {
    /// `initial * multiplier^(attempt - 1)`
    Exponential,
    /// `initial * attempt`
    Linear,
}

/// Retry policy with capped backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Cap applied to every delay.
    pub max_backoff: Duration,
    /// Growth factor for exponential backoff.
    pub backoff_multiplier: f64,
    pub growth: BackoffGrowth,
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        FetchError::is_retryable(self)
    }
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        StoreError::is_retryable(self)
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let factor = match self.growth {
            BackoffGrowth::Exponential => self.backoff_multiplier.powi(attempt as i32 - 1),
            BackoffGrowth::Linear => f64::from(attempt),
        };
        let delay = self.initial_backoff.as_secs_f64() * factor;
        // A multiplier that shrinks the delay below zero falls back to the base delay.
        if !delay.is_finite() || delay <= 0.0 {
            return self.initial_backoff.min(self.max_backoff);
        }
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }

    /// Whether another attempt is allowed after `attempt` failed with `error`.
    pub fn should_retry<E: Retryable>(&self, error: &E, attempt: u32) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `on_retry` is called with the failed attempt number and the error before
    /// each wait, so callers can log with their own context.
    pub async fn run<T, E, F, Fut>(&self, mut op: F, mut on_retry: impl FnMut(u32, &E)) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(&e, attempt) => {
                    on_retry(attempt, &e);
                    tokio::time::sleep(self.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            growth: BackoffGrowth::Exponential,
        }
    }
}
