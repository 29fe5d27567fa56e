//! Bounded retry with a fixed delay
//!
//! Sleeping goes through the [`Sleeper`] trait so retry loops can be tested
//! without real delays.

use sqlpacket_core::{AgentConfig, Error, Result};
use std::time::Duration;
use tracing::warn;

/// Trait for sleeping between attempts.
pub trait Sleeper: Send + Sync {
    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Real sleeper that uses `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealSleeper;

impl RealSleeper {
    /// Create a new real sleeper.
    pub fn new() -> Self {
        Self
    }
}

impl Sleeper for RealSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Pause after each failed attempt except the last
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: sqlpacket_core::config::DEFAULT_RETRY_COUNT,
            delay: Duration::from_secs(sqlpacket_core::config::DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Retry policy from the agent configuration
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.retry_count, config.retry_delay)
    }
}

/// Run `attempt` until it succeeds or the policy is exhausted
///
/// An attempt counts as a success only when it returns a value. `attempt`
/// receives the 1-based attempt number. After the final failure no sleep
/// happens and [`Error::ReconnectExhausted`] carries the last error seen.
pub fn retry<T, S, F>(policy: &RetryPolicy, sleeper: &S, mut attempt: F) -> Result<T>
where
    S: Sleeper + ?Sized,
    F: FnMut(u32) -> Result<T>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for n in 1..=max_attempts {
        match attempt(n) {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    attempt = n,
                    max_attempts,
                    error = %e,
                    "Attempt failed"
                );
                last_error = e.to_string();
                if n < max_attempts {
                    sleeper.sleep(policy.delay);
                }
            }
        }
    }

    Err(Error::ReconnectExhausted {
        attempts: max_attempts,
        last_error,
    })
}
