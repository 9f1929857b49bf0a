//! # Delivery bridge: transport callbacks → pump.
//!
//! Installed on the receiver as its [`ReceiveHandler`]. It holds only weak references, so a
//! receiver that outlives its pump cannot keep the pump alive or call into it.
//!
//! ```text
//! on_receive(batch) ─► [metrics snapshot] ─► pump.on_events(batch or []).await
//! on_error(err)     ─► Running → Errored, publish PumpErrored
//!                    └► executor.submit(pump.handle_delivery_error(err))   returns immediately
//! ```
//!
//! `on_error` runs on the transport's delivery task. Teardown awaits
//! `clear_receive_handler`, which waits for that same task, so the error path is deferred
//! to the executor instead of being awaited here.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::events::{Event, EventKind};
use crate::model::EventData;
use crate::pump::partition_pump::{PartitionPump, PumpShared};
use crate::pump::status::PumpStatus;
use crate::transport::{PartitionReceiver, ReceiveHandler};

pub(crate) struct DeliveryBridge {
    pump: Weak<PumpShared>,
    receiver: Weak<dyn PartitionReceiver>,
    max_batch_size: usize,
    metrics_enabled: bool,
    invoke_on_empty: bool,
}

impl DeliveryBridge {
    pub(crate) fn new(pump: &PartitionPump, receiver: &Arc<dyn PartitionReceiver>) -> Self {
        let options = pump.options();
        Self {
            pump: pump.downgrade(),
            receiver: Arc::downgrade(receiver),
            max_batch_size: options.max_batch_size,
            metrics_enabled: options.metrics_enabled,
            invoke_on_empty: options.invoke_on_empty_after_timeout,
        }
    }
}

#[async_trait]
impl ReceiveHandler for DeliveryBridge {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    async fn on_receive(&self, events: Option<Vec<EventData>>) {
        let Some(pump) = PartitionPump::upgrade(&self.pump) else {
            return;
        };

        if self.metrics_enabled {
            if let Some(info) = self.receiver.upgrade().and_then(|r| r.runtime_info()) {
                pump.context().set_runtime_info(info);
            }
        }

        let batch = match events {
            Some(batch) if !batch.is_empty() => batch,
            _ if self.invoke_on_empty => Vec::new(),
            _ => return,
        };
        pump.on_events(batch).await;
    }

    fn on_error(&self, error: TransportError) {
        let Some(pump) = PartitionPump::upgrade(&self.pump) else {
            return;
        };
        let shared = pump.shared();
        if !shared
            .status
            .transition(PumpStatus::Running, PumpStatus::Errored)
        {
            debug!(
                host = pump.host_name(),
                partition = pump.partition_id(),
                status = %pump.status(),
                error = %error,
                "ignoring receiver error outside running state"
            );
            return;
        }

        if error.is_fencing_conflict() {
            info!(
                host = pump.host_name(),
                partition = pump.partition_id(),
                epoch = pump.lease().epoch(),
                error = %error,
                "receiver disconnected by a higher epoch, another host likely took this partition"
            );
        } else {
            warn!(
                host = pump.host_name(),
                partition = pump.partition_id(),
                error = %error,
                "receiver error"
            );
        }
        shared.bus.publish(
            Event::new(EventKind::PumpErrored)
                .with_partition(pump.partition_id())
                .with_reason(error.to_string()),
        );

        let weak = self.pump.clone();
        shared.executor.submit(Box::new(move || {
            async move {
                if let Some(pump) = PartitionPump::upgrade(&weak) {
                    pump.handle_delivery_error(error).await;
                }
            }
            .boxed()
        }));
    }
}
