//! # Transport-kind capability interface.
//!
//! [`PartitionPump`] owns the transport-independent lifecycle: status, `on_open`, `on_close`,
//! batch forwarding, the once-only shutdown. What it means to *connect* and *disconnect*
//! is delegated to a [`PumpDriver`], one implementation per transport kind.
//!
//! ```text
//! PartitionPump::start()    ──► on_open ──► driver.start(pump)
//! PartitionPump::shutdown() ──► cancel  ──► driver.shutdown(pump, reason) ──► on_close
//! ```
//!
//! ## Contract
//! - `start` runs once, with status `Opening`. It leaves the pump `Running`, or reports the
//!   failure through [`PartitionPump::report_open_failure`] and leaves it `Closed`.
//!   When it observes shutdown it stops without writing the status.
//! - `shutdown` runs at most once, after any `start` has settled or the cancellation grace
//!   elapsed. It moves the pump to `Closing` and releases every transport resource; it must
//!   never fail.

use async_trait::async_trait;

use crate::processor::CloseReason;
use crate::pump::partition_pump::PartitionPump;

#[async_trait]
pub(crate) trait PumpDriver: Send + Sync + 'static {
    /// Short name of the transport kind (for logs).
    fn kind(&self) -> &'static str;

    async fn start(&self, pump: &PartitionPump);

    async fn shutdown(&self, pump: &PartitionPump, reason: CloseReason);
}
