//! # Transport seam.
//!
//! The pump never speaks a wire protocol itself. It drives these traits, which a
//! concrete event-stream client implements:
//!
//! ```text
//! Transport ──create_client()──► TransportClient ──create_epoch_receiver()──► PartitionReceiver
//!                                                                               │
//!                              set_receive_handler(Arc<dyn ReceiveHandler>) ◄───┘
//!                                         │
//!                 transport delivery task ├─► handler.on_receive(Option<Vec<EventData>>).await
//!                                         └─► handler.on_error(TransportError)
//! ```
//!
//! ## Contract the pump relies on
//! - A receiver opened with an epoch lower than the one in force fails with
//!   [`TransportErrorKind::EpochFenced`](crate::TransportErrorKind::EpochFenced), both at
//!   creation time and if it is later kicked off by a higher epoch.
//! - Deliveries for one receiver are sequential: the next `on_receive` starts only after
//!   the previous one returned. A slow handler slows the receiver down.
//! - `on_receive(None)` means "receive window elapsed with no events".
//! - [`PartitionReceiver::clear_receive_handler`] resolves only after every in-flight
//!   `on_receive`/`on_error` call has returned. Awaiting it from inside a handler callback
//!   never resolves.

pub mod mock;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::model::{Cursor, EventData, ReceiverRuntimeInfo};

/// Options passed to the transport when a receiver is created.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiverOptions {
    /// Ask the service to piggyback runtime info on deliveries.
    pub runtime_metrics_enabled: bool,
    /// Optional receiver identifier visible to the service.
    pub identifier: Option<String>,
}

/// Factory for transport clients; holds the connection configuration.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Short name of the transport kind (for logs).
    fn kind(&self) -> &'static str {
        "transport"
    }

    /// Establishes a new client connection.
    async fn create_client(&self) -> Result<Arc<dyn TransportClient>, TransportError>;
}

/// One established client connection.
#[async_trait]
pub trait TransportClient: Send + Sync + 'static {
    /// Creates a receiver bound to `epoch` for `partition_id` in `consumer_group`,
    /// starting at `cursor`.
    async fn create_epoch_receiver(
        &self,
        consumer_group: &str,
        partition_id: &str,
        cursor: &Cursor,
        epoch: u64,
        options: &ReceiverOptions,
    ) -> Result<Arc<dyn PartitionReceiver>, TransportError>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), TransportError>;
}

/// A receiver for one partition.
#[async_trait]
pub trait PartitionReceiver: Send + Sync + 'static {
    fn set_prefetch_count(&self, count: u32);

    fn set_receive_timeout(&self, timeout: Duration);

    /// Last runtime info reported by the service, if metrics were requested.
    fn runtime_info(&self) -> Option<ReceiverRuntimeInfo>;

    /// Installs the push handler; deliveries start after this call.
    fn set_receive_handler(&self, handler: Arc<dyn ReceiveHandler>, invoke_on_empty: bool);

    /// Uninstalls the handler and waits until in-flight callbacks have returned.
    async fn clear_receive_handler(&self) -> Result<(), TransportError>;

    /// Closes the receiver.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Push-side callbacks invoked by the transport's delivery task.
#[async_trait]
pub trait ReceiveHandler: Send + Sync + 'static {
    /// Largest batch the handler wants per delivery.
    fn max_batch_size(&self) -> usize;

    /// A batch arrived, or (`None`) a receive window elapsed empty.
    async fn on_receive(&self, events: Option<Vec<EventData>>);

    /// The receiver failed; no further deliveries follow.
    ///
    /// Runs on the delivery task and must return without waiting on the receiver.
    fn on_error(&self, error: TransportError);
}
