use std::sync::Arc;
use std::time::Duration;

use crate::models::ModelErrorKind;

/// Exponential backoff: `initial * multiplier^retry`, capped at `max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            multiplier: 2.0,
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    pub fn none() -> Self {
        Self {
            initial: Duration::ZERO,
            multiplier: 1.0,
            max: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0 = first retry).
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let seconds = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        if !seconds.is_finite() || seconds >= self.max.as_secs_f64() {
            return self.max;
        }
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
    Abort,
}

/// Decides, per adapter error kind, whether a failed model call is retried.
///
/// `max_retries` is the ceiling on retries after the first attempt for
/// rate limits, timeouts and unusable responses. Transport errors get a
/// single retry and authentication failures are never retried.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self::with_sleeper(max_retries, backoff, Arc::new(ThreadSleeper))
    }

    pub fn with_sleeper(max_retries: u32, backoff: Backoff, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            max_retries,
            backoff,
            sleeper,
        }
    }

    /// `retries_so_far` counts retries already spent on this batch.
    pub fn decide(&self, kind: ModelErrorKind, retries_so_far: u32) -> RetryDecision {
        let ceiling = match kind {
            ModelErrorKind::AuthFailure => return RetryDecision::Abort,
            ModelErrorKind::TransportError => self.max_retries.min(1),
            ModelErrorKind::RateLimited
            | ModelErrorKind::Timeout
            | ModelErrorKind::InvalidResponse => self.max_retries,
        };

        if retries_so_far >= ceiling {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry(self.backoff.delay(retries_so_far))
        }
    }

    pub fn sleep(&self, duration: Duration) {
        self.sleeper.sleep(duration);
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Backoff, RetryDecision, RetryPolicy};
    use crate::models::ModelErrorKind;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_retries,
            Backoff {
                initial: Duration::from_millis(100),
                multiplier: 2.0,
                max: Duration::from_millis(350),
            },
        )
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let backoff = policy(5).backoff;
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(350));
        assert_eq!(backoff.delay(40), Duration::from_millis(350));
    }

    #[test]
    fn transport_errors_are_retried_once() {
        let policy = policy(4);
        assert!(matches!(
            policy.decide(ModelErrorKind::TransportError, 0),
            RetryDecision::Retry(_)
        ));
        assert_eq!(
            policy.decide(ModelErrorKind::TransportError, 1),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn auth_failure_aborts_without_retry() {
        assert_eq!(
            policy(4).decide(ModelErrorKind::AuthFailure, 0),
            RetryDecision::Abort
        );
    }

    #[test]
    fn zero_ceiling_gives_up_immediately() {
        assert_eq!(
            policy(0).decide(ModelErrorKind::RateLimited, 0),
            RetryDecision::GiveUp
        );
    }
}
