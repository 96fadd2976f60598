//! Retry with exponential backoff for transient failures
//!
//! Only errors for which [`Error::is_transient`] holds are retried. A rejected report is
//! an `Ok` value and never reaches this module.

use crate::error::{Error, Result};
use backoff::{backoff::Backoff, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Whether to add jitter to prevent thundering herd
    pub jitter: bool,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: true,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Policy that never retries
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            current_interval: Duration::from_millis(self.base_delay_ms),
            initial_interval: Duration::from_millis(self.base_delay_ms),
            max_interval: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            max_elapsed_time: None, // attempts are bounded separately
            ..Default::default()
        };

        if !self.jitter {
            backoff.randomization_factor = 0.0;
        }

        backoff
    }
}

/// Decision on whether to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    NoRetry,
}

/// Tracks attempts and delays for one operation
#[derive(Debug)]
pub struct RetryHandler {
    policy: RetryPolicy,
    attempts: u32,
    backoff: ExponentialBackoff,
}

impl RetryHandler {
    pub fn new(policy: RetryPolicy) -> Self {
        let backoff = policy.create_backoff();
        Self {
            policy,
            attempts: 0,
            backoff,
        }
    }

    pub fn should_retry(&mut self, error: &Error) -> RetryDecision {
        if self.attempts >= self.policy.max_attempts || !error.is_transient() {
            return RetryDecision::NoRetry;
        }

        self.attempts += 1;
        let delay = self
            .backoff
            .next_backoff()
            .unwrap_or(Duration::from_millis(self.policy.max_delay_ms));
        RetryDecision::Retry { delay }
    }

    /// Number of retries granted so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
        self.backoff.reset();
    }
}

/// Run `operation` until it succeeds, fails permanently, or retries run out
pub async fn execute_with_retry<F, Fut, T>(mut operation: F, policy: RetryPolicy) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut handler = RetryHandler::new(policy);

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => match handler.should_retry(&e) {
                RetryDecision::Retry { delay } => {
                    warn!(
                        attempt = handler.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::NoRetry => {
                    if e.is_transient() {
                        error!(attempts = handler.attempts(), error = %e, "Giving up after retries");
                    }
                    return Err(e);
                }
            },
        }
    }
}
