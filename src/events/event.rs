//! # Runtime events emitted by partition pumps and renewal timers.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Pump events**: open attempts, status transitions, deliveries, teardown faults
//! - **Renewal events**: timer firings and terminal stop
//!
//! The [`Event`] struct carries metadata such as timestamps, partition id,
//! attempt number, epoch, and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use eventpump::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::OpenAttemptFailed)
//!     .with_partition("7")
//!     .with_attempt(2)
//!     .with_epoch(3)
//!     .with_reason("connection: refused");
//!
//! assert_eq!(ev.kind, EventKind::OpenAttemptFailed);
//! assert_eq!(ev.partition.as_deref(), Some("7"));
//! assert_eq!(ev.epoch, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Pump lifecycle ===
    /// Pump entered `Opening`.
    ///
    /// Sets: `partition`, `epoch`
    PumpOpening,

    /// One open attempt failed with a transient error.
    ///
    /// Sets: `partition`, `attempt`, `epoch`, `reason`
    OpenAttemptFailed,

    /// Receiver is installed and deliveries may flow.
    ///
    /// Sets: `partition`, `attempt`, `epoch`
    PumpRunning,

    /// Open failed (fatal, exhausted, or `on_open` rejected).
    ///
    /// Sets: `partition`, `reason`
    OpenFailed,

    /// The transport reported a runtime error.
    ///
    /// Sets: `partition`, `reason`
    PumpErrored,

    /// Shutdown has begun.
    ///
    /// Sets: `partition`, `reason` (close reason)
    PumpClosing,

    /// Pump is closed; no further callbacks will reach the application.
    ///
    /// Sets: `partition`
    PumpClosed,

    /// Closing a resource failed (swallowed).
    ///
    /// Sets: `partition`, `reason`
    TeardownFault,

    /// A batch was handed to the application.
    ///
    /// Sets: `partition`, `count`
    BatchDelivered,

    // === Renewal ===
    /// A renewal timer fired and ran its action.
    ///
    /// Sets: `partition` (owner id), `reason` on failure
    RenewalFired,

    /// A renewal timer stopped rescheduling.
    ///
    /// Sets: `partition` (owner id), `reason`
    RenewalStopped,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Partition id (or renewal owner id).
    pub partition: Option<Arc<str>>,
    /// Open attempt number (starting from 1).
    pub attempt: Option<u32>,
    /// Epoch in force.
    pub epoch: Option<u64>,
    /// Number of events in a delivered batch.
    pub count: Option<usize>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            partition: None,
            attempt: None,
            epoch: None,
            count: None,
            reason: None,
        }
    }

    /// Attaches a partition id.
    #[inline]
    pub fn with_partition(mut self, partition: impl Into<Arc<str>>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Attaches an attempt number.
    #[inline]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches an epoch.
    #[inline]
    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = Some(epoch);
        self
    }

    /// Attaches a batch size.
    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns `true` for the terminal pump event.
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self.kind, EventKind::PumpClosed)
    }
}
