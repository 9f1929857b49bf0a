//! # Pump lifecycle status.
//!
//! ```text
//! Opening ──► Running ──► Closing ──► Closed
//!    │           │           ▲
//!    ▼           ▼           │
//! OpenFailed   Errored ──────┘   (Errored waits for shutdown)
//!    └───────────────────────┘
//! ```
//!
//! ## Rules
//! - Only the pump's own control flow and the delivery bridge's error path write the status.
//! - Readers elsewhere get a value consistent with one recent write; nothing stronger.
//! - `Running` is the only state in which deliveries are expected.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a partition pump.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PumpStatus {
    /// Created, `start` not called yet.
    Uninitialized = 0,
    /// `on_open` and the connection open sequence are in progress.
    Opening = 1,
    /// The open sequence failed; teardown follows.
    OpenFailed = 2,
    /// Receiver installed, batches flowing.
    Running = 3,
    /// The transport reported an error; shutdown has been handed off.
    Errored = 4,
    /// Teardown in progress.
    Closing = 5,
    /// Terminal.
    Closed = 6,
}

impl PumpStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => PumpStatus::Opening,
            2 => PumpStatus::OpenFailed,
            3 => PumpStatus::Running,
            4 => PumpStatus::Errored,
            5 => PumpStatus::Closing,
            6 => PumpStatus::Closed,
            _ => PumpStatus::Uninitialized,
        }
    }

    /// `Closing` or `Closed`.
    #[inline]
    pub fn is_closing_or_closed(&self) -> bool {
        matches!(self, PumpStatus::Closing | PumpStatus::Closed)
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            PumpStatus::Uninitialized => "uninitialized",
            PumpStatus::Opening => "opening",
            PumpStatus::OpenFailed => "open_failed",
            PumpStatus::Running => "running",
            PumpStatus::Errored => "errored",
            PumpStatus::Closing => "closing",
            PumpStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for PumpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Atomic cell holding a [`PumpStatus`].
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) fn new(status: PumpStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    #[inline]
    pub(crate) fn get(&self) -> PumpStatus {
        PumpStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set(&self, status: PumpStatus) {
        self.0.store(status as u8, Ordering::Release);
    }

    /// Sets `to` only if the current value is `from`. Returns whether it did.
    #[inline]
    pub(crate) fn transition(&self, from: PumpStatus, to: PumpStatus) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
