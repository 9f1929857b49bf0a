//! # LogWriter: events to `tracing`
//!
//! A minimal subscriber that re-emits incoming [`Event`]s as `tracing` records under
//! the `eventpump::events` target. Useful in demos and tests; production hosts usually
//! route the bus into their own metrics instead.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO eventpump::events: pump opening partition="7" epoch=3
//! WARN eventpump::events: open attempt failed partition="7" attempt=1 epoch=3 reason="connection: refused"
//! INFO eventpump::events: pump running partition="7" attempt=2 epoch=3
//! INFO eventpump::events: pump closing partition="7" reason="lease_lost"
//! INFO eventpump::events: pump closed partition="7"
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let partition = e.partition.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::PumpOpening => {
                info!(target: "eventpump::events", partition, epoch = ?e.epoch, "pump opening");
            }
            EventKind::OpenAttemptFailed => {
                warn!(
                    target: "eventpump::events",
                    partition, attempt = ?e.attempt, epoch = ?e.epoch, reason,
                    "open attempt failed"
                );
            }
            EventKind::PumpRunning => {
                info!(
                    target: "eventpump::events",
                    partition, attempt = ?e.attempt, epoch = ?e.epoch,
                    "pump running"
                );
            }
            EventKind::OpenFailed => {
                warn!(target: "eventpump::events", partition, reason, "open failed");
            }
            EventKind::PumpErrored => {
                warn!(target: "eventpump::events", partition, reason, "pump errored");
            }
            EventKind::PumpClosing => {
                info!(target: "eventpump::events", partition, reason, "pump closing");
            }
            EventKind::PumpClosed => {
                info!(target: "eventpump::events", partition, "pump closed");
            }
            EventKind::TeardownFault => {
                warn!(target: "eventpump::events", partition, reason, "teardown fault");
            }
            EventKind::BatchDelivered => {
                debug!(target: "eventpump::events", partition, count = ?e.count, "batch delivered");
            }
            EventKind::RenewalFired => {
                debug!(target: "eventpump::events", client = partition, reason, "renewal fired");
            }
            EventKind::RenewalStopped => {
                info!(target: "eventpump::events", client = partition, reason, "renewal stopped");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
