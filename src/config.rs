//! # Pump configuration.
//!
//! [`PumpOptions`] centralizes the settings every partition pump reads:
//! receiver tuning (prefetch, receive timeout, runtime metrics), batch delivery
//! (max batch size, empty-batch invocation), and the open/shutdown envelope
//! (retry policy, per-attempt timeout, cancellation grace).
//!
//! ## Sentinel values
//! - `open_attempt_timeout = 0s` → no per-attempt timeout
//! - `cancel_grace = 0s` → shutdown does not wait for a cancelled open to settle

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::OpenRetryPolicy;

/// Options applied to every pump created with them.
///
/// ## Field semantics
/// - `prefetch_count`: receiver prefetch depth
/// - `receive_timeout`: per-call receive timeout; an empty window of this length yields an empty delivery
/// - `metrics_enabled`: ask the receiver for runtime info and snapshot it into the context on each delivery
/// - `max_batch_size`: upper bound of events per delivery advertised to the transport
/// - `invoke_on_empty_after_timeout`: call `on_events` with an empty batch when a receive window elapses
/// - `open_retry`: bound and pacing of open attempts
/// - `open_attempt_timeout`: per-attempt open timeout (`0s` = none)
/// - `cancel_grace`: how long shutdown waits for a cancelled open to settle
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct PumpOptions {
    /// Receiver prefetch depth.
    pub prefetch_count: u32,
    /// Receive timeout per call.
    pub receive_timeout: Duration,
    /// Snapshot receiver runtime info into the partition context.
    pub metrics_enabled: bool,
    /// Maximum events per delivered batch.
    pub max_batch_size: usize,
    /// Deliver empty batches after a receive timeout.
    pub invoke_on_empty_after_timeout: bool,
    /// Open retry bound and pacing.
    pub open_retry: OpenRetryPolicy,
    /// Per-attempt open timeout.
    ///
    /// - `Duration::ZERO` = no timeout (the attempt runs until it settles or is cancelled)
    /// - `> 0` = a slower attempt is treated as a transient failure
    pub open_attempt_timeout: Duration,
    /// Grace period shutdown waits for an in-flight open to observe cancellation.
    pub cancel_grace: Duration,
    /// Capacity of the pump's event bus.
    pub bus_capacity: usize,
}

impl PumpOptions {
    /// Returns the per-attempt open timeout as an `Option`.
    #[inline]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        if self.open_attempt_timeout.is_zero() {
            None
        } else {
            Some(self.open_attempt_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks option combinations a pump cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if (self.prefetch_count as usize) < self.max_batch_size {
            return Err(ConfigError::PrefetchBelowBatch {
                prefetch: self.prefetch_count,
                batch: self.max_batch_size,
            });
        }
        if self.open_retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.receive_timeout.is_zero() {
            return Err(ConfigError::ZeroReceiveTimeout(self.receive_timeout));
        }
        Ok(())
    }

    /// Returns options with `invoke_on_empty_after_timeout` set.
    pub fn with_empty_batches(mut self, enabled: bool) -> Self {
        self.invoke_on_empty_after_timeout = enabled;
        self
    }

    /// Returns options with `metrics_enabled` set.
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Returns options with the given retry policy.
    pub fn with_open_retry(mut self, retry: OpenRetryPolicy) -> Self {
        self.open_retry = retry;
        self
    }
}

impl Default for PumpOptions {
    /// Default options:
    ///
    /// - `prefetch_count = 300`, `receive_timeout = 60s`, `max_batch_size = 10`
    /// - metrics and empty-batch invocation off
    /// - `open_retry = OpenRetryPolicy::default()` (5 attempts, immediate)
    /// - no per-attempt timeout, `cancel_grace = 5s`, `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            prefetch_count: 300,
            receive_timeout: Duration::from_secs(60),
            metrics_enabled: false,
            max_batch_size: 10,
            invoke_on_empty_after_timeout: false,
            open_retry: OpenRetryPolicy::default(),
            open_attempt_timeout: Duration::ZERO,
            cancel_grace: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let opts = PumpOptions::default();
        assert_eq!(opts.validate(), Ok(()));
        assert_eq!(opts.attempt_timeout(), None);
        assert_eq!(opts.open_retry.max_attempts, 5);
    }

    #[test]
    fn rejects_prefetch_below_batch() {
        let opts = PumpOptions {
            prefetch_count: 5,
            max_batch_size: 10,
            ..PumpOptions::default()
        };
        assert_eq!(
            opts.validate(),
            Err(ConfigError::PrefetchBelowBatch {
                prefetch: 5,
                batch: 10
            })
        );
    }

    #[test]
    fn rejects_zero_values() {
        let zero_batch = PumpOptions {
            max_batch_size: 0,
            ..PumpOptions::default()
        };
        assert_eq!(zero_batch.validate(), Err(ConfigError::ZeroBatchSize));

        let mut zero_attempts = PumpOptions::default();
        zero_attempts.open_retry.max_attempts = 0;
        assert_eq!(zero_attempts.validate(), Err(ConfigError::ZeroAttempts));

        let zero_timeout = PumpOptions {
            receive_timeout: Duration::ZERO,
            ..PumpOptions::default()
        };
        assert!(matches!(
            zero_timeout.validate(),
            Err(ConfigError::ZeroReceiveTimeout(_))
        ));
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let opts = PumpOptions {
            bus_capacity: 0,
            ..PumpOptions::default()
        };
        assert_eq!(opts.bus_capacity_clamped(), 1);
    }
}
