//! Bounded provider attempts
//!
//! One logical request becomes at most `max_attempts` provider calls. Each
//! call runs under a hard deadline and an overrun counts as a transient
//! failure. Only transient failures earn another attempt, after a pause
//! that doubles (by default) per failure, capped at `max_delay`, plus up to
//! 25% jitter.

use crate::config::RetrySettings;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tasklane_llm::Error as LlmError;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Failure classification the attempt loop needs
pub trait Transient: Sized {
    /// Whether repeating the same call may succeed
    fn is_transient(&self) -> bool;

    /// Failure recorded when an attempt overruns its deadline
    fn deadline_elapsed(after: Duration) -> Self;
}

impl Transient for LlmError {
    fn is_transient(&self) -> bool {
        LlmError::is_transient(self)
    }

    fn deadline_elapsed(after: Duration) -> Self {
        LlmError::Timeout(after.as_millis() as u64)
    }
}

/// The last failure of a request that gave up
#[derive(Debug)]
pub struct Exhausted<E> {
    /// Failure of the final attempt
    pub last_error: E,
    /// Provider calls made, the first one included
    pub attempts: u32,
}

/// How many times a provider call is tried and how long each try may take
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: bool,
    attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Policy from the `[ai.retry]` table and the per-attempt deadline
    #[must_use]
    pub fn from_settings(settings: &RetrySettings, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            multiplier: settings.backoff_multiplier,
            jitter: settings.jitter,
            attempt_timeout,
        }
    }

    /// Upper bound on provider calls per request
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Deadline for a single provider call
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Pause after the `failed`-th attempt (1-based)
    pub(crate) fn backoff(&self, failed: u32) -> Duration {
        let steps = failed.saturating_sub(1).min(64) as i32;
        let grown = self.initial_delay.as_secs_f64() * self.multiplier.powi(steps);
        // NaN (zero delay times infinite growth) falls through `min` to the cap
        let base = Duration::from_secs_f64(grown.min(self.max_delay.as_secs_f64()));

        if self.jitter {
            base + base.mul_f64(rand::thread_rng().gen_range(0.0..0.25))
        } else {
            base
        }
    }

    /// Call `attempt` until it succeeds, fails definitively or the attempt
    /// budget runs out.
    pub async fn run<T, E, F, Fut>(&self, mut attempt: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let mut made = 0;
        loop {
            made += 1;
            let error = match timeout(self.attempt_timeout, attempt()).await {
                Ok(Ok(value)) => {
                    if made > 1 {
                        debug!(attempt = made, "Provider call succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(e)) => e,
                Err(_) => {
                    warn!(
                        attempt = made,
                        timeout_ms = self.attempt_timeout.as_millis() as u64,
                        "Provider call overran its deadline"
                    );
                    E::deadline_elapsed(self.attempt_timeout)
                }
            };

            if !error.is_transient() || made >= self.max_attempts {
                debug!(attempt = made, error = %error, "Giving up on provider call");
                return Err(Exhausted {
                    last_error: error,
                    attempts: made,
                });
            }

            let pause = self.backoff(made);
            warn!(
                attempt = made,
                max_attempts = self.max_attempts,
                delay_ms = pause.as_millis() as u64,
                error = %error,
                "Transient provider failure, backing off"
            );
            sleep(pause).await;
        }
    }
}
