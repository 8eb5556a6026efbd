//! Retry policy for advisory provider calls.
//!
//! Exponential backoff with jitter. Calls are blocking, so the wait is a
//! plain thread sleep.

use crate::observe::{Observer, ObserverEvent};
use std::fmt::Display;
use std::time::Duration;

/// Classifies a failure as transient.
pub trait RetryableError {
    fn is_retryable(&self) -> bool;
}

/// How often and how patiently a provider call is repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total tries, first one included. Zero behaves like one.
    pub max_attempts: u32,
    /// Wait after the first failure; doubles after each further one.
    pub base_delay: Duration,
    /// Upper bound on a single wait, before jitter.
    pub max_delay: Duration,
    /// Relative spread applied to each wait, clamped to `0.0..=1.0`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// Wait before the attempt following failed attempt `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let doublings = attempt.max(1) - 1;
        let factor = 2_u32.saturating_pow(doublings);
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let spread = if self.jitter.is_nan() { 0.0 } else { self.jitter.clamp(0.0, 1.0) };
        if capped.is_zero() || spread == 0.0 {
            return capped;
        }
        capped.mul_f64(1.0 + spread * (2.0 * fastrand::f64() - 1.0))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. `op` receives the 1-based attempt number.
pub fn run_with_retry<T, E, F>(
    phase: &str,
    policy: &RetryPolicy,
    observer: &dyn Observer,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    E: RetryableError + Display,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        let err = match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_retryable() || attempt >= max_attempts {
            return Err(err);
        }

        let delay = policy.backoff_delay(attempt);
        observer.event(
            &ObserverEvent::debug("advisory.retry", "Transient provider failure, retrying")
                .with_field("phase", phase)
                .with_field("attempt", attempt)
                .with_field("max_attempts", max_attempts)
                .with_field("delay_ms", delay.as_millis())
                .with_field("error", &err),
        );
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        attempt += 1;
    }
}
