//! # Retry policy for the connection open sequence.
//!
//! [`OpenRetryPolicy`] bounds how many times the opener tries to create a client and an
//! epoch receiver, and how long it waits between transient failures.
//!
//! The wait before retry `n` (1-based, counted after the failed attempt) is
//! `first × factor^(n-1)`, clamped to `max`, then jittered if enabled.
//! A `first` of zero means retry immediately, which is the default.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use eventpump::OpenRetryPolicy;
//!
//! let retry = OpenRetryPolicy {
//!     max_attempts: 5,
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(1),
//!     factor: 2.0,
//!     jitter: false,
//! };
//!
//! assert_eq!(retry.delay(1), Duration::from_millis(100));
//! assert_eq!(retry.delay(2), Duration::from_millis(200));
//! assert_eq!(retry.delay(10), Duration::from_secs(1));
//! ```

use std::time::Duration;

use rand::Rng;

/// Bounds and pacing of open attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OpenRetryPolicy {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Wait after the first transient failure (`0` = retry immediately).
    pub first: Duration,
    /// Upper bound for any single wait.
    pub max: Duration,
    /// Multiplicative growth between consecutive waits.
    pub factor: f64,
    /// Spread waits over `[delay/2, delay]` to avoid synchronized reconnects.
    pub jitter: bool,
}

impl Default for OpenRetryPolicy {
    /// Returns a policy with:
    /// - `max_attempts = 5`;
    /// - `first = 0` (immediate retry);
    /// - `max = 10s`, `factor = 2.0`, no jitter.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            first: Duration::ZERO,
            max: Duration::from_secs(10),
            factor: 2.0,
            jitter: false,
        }
    }
}

impl OpenRetryPolicy {
    /// Returns `true` if another attempt is allowed after `attempts` have been made.
    #[inline]
    pub fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Computes the wait after the `failed_attempt`-th transient failure (1-based).
    pub fn delay(&self, failed_attempt: u32) -> Duration {
        if self.first.is_zero() {
            return Duration::ZERO;
        }
        let exp = failed_attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };

        if self.jitter {
            equal_jitter(base)
        } else {
            base
        }
    }
}

/// delay/2 + random[0, delay/2]
fn equal_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    let half = ms / 2;
    if half == 0 {
        return delay;
    }
    let extra = rand::rng().random_range(0..=half);
    Duration::from_millis(half + extra)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retries_immediately_five_times() {
        let policy = OpenRetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        for n in 1..5 {
            assert_eq!(policy.delay(n), Duration::ZERO);
        }
        assert!(policy.allows(4));
        assert!(!policy.allows(5));
    }

    #[test]
    fn exponential_growth_is_capped() {
        let policy = OpenRetryPolicy {
            max_attempts: 5,
            first: Duration::from_millis(50),
            max: Duration::from_millis(300),
            factor: 2.0,
            jitter: false,
        };
        assert_eq!(policy.delay(1), Duration::from_millis(50));
        assert_eq!(policy.delay(2), Duration::from_millis(100));
        assert_eq!(policy.delay(3), Duration::from_millis(200));
        assert_eq!(policy.delay(4), Duration::from_millis(300));
        assert_eq!(policy.delay(u32::MAX), Duration::from_millis(300));
    }

    #[test]
    fn jitter_stays_within_half_and_full() {
        let policy = OpenRetryPolicy {
            max_attempts: 5,
            first: Duration::from_millis(1000),
            max: Duration::from_secs(10),
            factor: 1.0,
            jitter: true,
        };
        for n in 1..50 {
            let d = policy.delay(n);
            assert!(d >= Duration::from_millis(500), "{d:?} below half");
            assert!(d <= Duration::from_millis(1000), "{d:?} above base");
        }
    }
}
