//! # Epoch-receiver driver.
//!
//! The [`PumpDriver`] for transports that push batches through an epoch receiver.
//!
//! ## Start
//! ```text
//! opener.open() ─┬─ Ok(opened) ─► lock(slot) ─┬─ shutting down ─► unlock, tear the handle down
//!                │                            └─ Opening → Running:
//!                │                                 set_receive_handler(bridge), store handle
//!                ├─ Err(Cancelled) ─► nothing (shutdown owns the rest)
//!                └─ Err(e)         ─► report_open_failure(e)
//!                                     OpenFailed → Closing ─► teardown ─► Closed
//! ```
//!
//! ## Shutdown
//! ```text
//! cancel in-flight attempt ─► lock(slot): → Closing, take handle ─► teardown
//! teardown = clear_receive_handler ─► receiver.close ─► client.close   (faults published, never raised)
//! ```
//!
//! The slot lock is what keeps a handle produced by a late-finishing open from being
//! installed after shutdown has already emptied the slot.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{OpenError, TransportError};
use crate::events::{Event, EventKind};
use crate::processor::CloseReason;
use crate::pump::bridge::DeliveryBridge;
use crate::pump::driver::PumpDriver;
use crate::pump::inflight::InFlight;
use crate::pump::opener::{ConnectionHandle, ConnectionOpener, OpenRequest, Opened};
use crate::pump::partition_pump::PartitionPump;
use crate::pump::status::PumpStatus;
use crate::transport::Transport;

pub(crate) struct ReceiverDriver<T: Transport> {
    opener: ConnectionOpener<T>,
    in_flight: InFlight,
    handle: Mutex<Option<ConnectionHandle>>,
}

impl<T: Transport> ReceiverDriver<T> {
    pub(crate) fn new(transport: Arc<T>) -> Self {
        Self {
            opener: ConnectionOpener::new(transport),
            in_flight: InFlight::new(),
            handle: Mutex::new(None),
        }
    }

    /// Installs the handler and stores the handle, unless shutdown got there first.
    ///
    /// Returns the handle back when it was rejected.
    fn install(&self, pump: &PartitionPump, opened: Opened) -> Result<(), ConnectionHandle> {
        let mut slot = self.handle.lock();
        if pump.is_shutting_down()
            || !pump
                .shared()
                .status
                .transition(PumpStatus::Opening, PumpStatus::Running)
        {
            return Err(opened.handle);
        }
        let bridge = Arc::new(DeliveryBridge::new(pump, &opened.handle.receiver));
        opened
            .handle
            .receiver
            .set_receive_handler(bridge, pump.options().invoke_on_empty_after_timeout);
        *slot = Some(opened.handle);
        Ok(())
    }

    async fn fail_open(&self, pump: &PartitionPump, err: OpenError) {
        if !pump.report_open_failure(err).await {
            return;
        }
        let leftover = {
            let mut slot = self.handle.lock();
            if !pump
                .shared()
                .status
                .transition(PumpStatus::OpenFailed, PumpStatus::Closing)
            {
                return;
            }
            slot.take()
        };
        pump.shared().bus.publish(
            Event::new(EventKind::PumpClosing)
                .with_partition(pump.partition_id())
                .with_reason("open_failed"),
        );
        match leftover {
            Some(handle) => teardown(pump, handle).await,
            None => debug!(
                host = pump.host_name(),
                partition = pump.partition_id(),
                "no connection to release after failed open"
            ),
        }
        pump.mark_closed();
    }
}

#[async_trait]
impl<T: Transport> PumpDriver for ReceiverDriver<T> {
    fn kind(&self) -> &'static str {
        "epoch_receiver"
    }

    async fn start(&self, pump: &PartitionPump) {
        let shared = pump.shared();
        let req = OpenRequest {
            lease: &shared.lease,
            context: &shared.context,
            options: &shared.options,
            in_flight: &self.in_flight,
            shutdown: pump.shutdown_token(),
            bus: &shared.bus,
        };

        match self.opener.open(req).await {
            Ok(opened) => {
                let (attempts, epoch) = (opened.attempts, opened.epoch);
                match self.install(pump, opened) {
                    Ok(()) => {
                        info!(
                            host = pump.host_name(),
                            partition = pump.partition_id(),
                            epoch,
                            attempts,
                            "pump running"
                        );
                        shared.bus.publish(
                            Event::new(EventKind::PumpRunning)
                                .with_partition(pump.partition_id())
                                .with_attempt(attempts)
                                .with_epoch(epoch),
                        );
                    }
                    Err(rejected) => {
                        info!(
                            host = pump.host_name(),
                            partition = pump.partition_id(),
                            "shutdown raced the open, releasing the new connection"
                        );
                        teardown(pump, rejected).await;
                    }
                }
            }
            Err(OpenError::Cancelled) => {
                debug!(
                    host = pump.host_name(),
                    partition = pump.partition_id(),
                    "open cancelled by shutdown"
                );
            }
            Err(err) => self.fail_open(pump, err).await,
        }
    }

    async fn shutdown(&self, pump: &PartitionPump, reason: CloseReason) {
        if self.in_flight.cancel() {
            debug!(
                host = pump.host_name(),
                partition = pump.partition_id(),
                "cancelled in-flight open attempt"
            );
        }

        let handle = {
            let mut slot = self.handle.lock();
            let status = &pump.shared().status;
            if !status.get().is_closing_or_closed() {
                status.set(PumpStatus::Closing);
            }
            slot.take()
        };

        match handle {
            Some(handle) => {
                info!(
                    host = pump.host_name(),
                    partition = pump.partition_id(),
                    %reason,
                    "releasing connection"
                );
                teardown(pump, handle).await;
            }
            None => {
                debug!(
                    host = pump.host_name(),
                    partition = pump.partition_id(),
                    %reason,
                    "no connection to release"
                );
            }
        }
    }
}

/// Clears the handler, then closes receiver and client. Errors are logged and published.
async fn teardown(pump: &PartitionPump, handle: ConnectionHandle) {
    let ConnectionHandle { client, receiver } = handle;

    if let Err(e) = receiver.clear_receive_handler().await {
        fault(pump, "clearing receive handler", e);
    }
    if let Err(e) = receiver.close().await {
        fault(pump, "closing receiver", e);
    }
    if let Err(e) = client.close().await {
        fault(pump, "closing client", e);
    }
}

fn fault(pump: &PartitionPump, step: &'static str, error: TransportError) {
    warn!(
        host = pump.host_name(),
        partition = pump.partition_id(),
        step,
        error = %error,
        "teardown step failed"
    );
    pump.bus().publish(
        Event::new(EventKind::TeardownFault)
            .with_partition(pump.partition_id())
            .with_reason(format!("{step}: {error}")),
    );
}
