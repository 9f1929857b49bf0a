//! # eventpump
//!
//! **eventpump** is the consumption-side runtime of a partitioned event-stream client.
//!
//! For every partition a host holds a lease on, a [`PartitionPump`] opens an
//! epoch-fenced receiver through a pluggable [`Transport`](transport::Transport), pushes
//! batches into the application's [`EventProcessor`], and tears the connection down safely
//! on transport error, lease loss or host shutdown. A [`RenewalScheduler`] keeps
//! credentials fresh for as long as its owner is open.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Lease store ──(partition, epoch)──┐        ┌── Cursor source (token | timestamp)
//!                                     ▼        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  PartitionPump (one per leased partition)                         │
//! │  - status cell   Opening → Running → Closing → Closed             │
//! │  - Bus           (broadcast lifecycle events)                     │
//! │  - Executor      (runs error-triggered teardown off the delivery) │
//! │  - PumpDriver    ReceiverDriver<T: Transport>                     │
//! └──────┬───────────────────────────────────────────────▲────────────┘
//!        │ ConnectionOpener                              │ on_events / deferred error
//!        ▼                                               │
//! ┌──────────────┐ create_epoch_receiver ┌───────────────┴────────┐
//! │ TransportCli │ ────────────────────► │ PartitionReceiver      │
//! │ (≤ 1 alive)  │                       │  └─ DeliveryBridge     │
//! └──────────────┘                       └────────────────────────┘
//!                                                 │ sequential deliveries
//!                                                 ▼
//!                                        EventProcessor (application)
//! ```
//!
//! ### Lifecycle
//! ```text
//! start()
//!   ├─► Opening, on_open(ctx)
//!   ├─► loop (≤ open_retry.max_attempts) {
//!   │     epoch = lease.epoch()
//!   │     create_client ─► create_epoch_receiver(cursor, epoch) ─► lease.stamp_epoch(epoch)
//!   │       ├─ Ok          ─► Running, install DeliveryBridge
//!   │       ├─ EpochFenced ─► stop retrying
//!   │       └─ other       ─► close partial client, retry
//!   │   }
//!   └─ failed ─► on_error once, OpenFailed → Closing → Closed
//!
//! delivery:  on_receive(batch | None) ─► on_events(ctx, batch | [])       (backpressure)
//! error:     on_error(err) ─► Errored ─► executor: on_error(ctx) ─► shutdown(Shutdown)
//! shutdown:  cancel open ─► Closing ─► clear handler ─► close receiver ─► close client
//!            ─► on_close(ctx, reason) ─► Closed
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                         |
//! |-------------------|-----------------------------------------------------------------|--------------------------------------------|
//! | **Pump**          | Per-partition open, delivery and teardown.                      | [`PartitionPump`], [`PumpStatus`]          |
//! | **Application**   | Hooks called at lifecycle points.                               | [`EventProcessor`], [`ProcessorFn`]        |
//! | **Transport**     | The seam a concrete client implements; scripted mock included.  | [`transport::Transport`], [`transport::mock`] |
//! | **Renewal**       | Self-rescheduling credential refresh.                           | [`RenewalScheduler`], [`Renew`]            |
//! | **Subscriber API**| Observe lifecycle events (logging, metrics, alerts).            | [`Subscribe`], [`SubscriberSet`]           |
//! | **Errors**        | Typed errors with stable labels.                                | [`OpenError`], [`PumpError`], [`TransportError`] |
//! | **Configuration** | Receiver tuning, batching, retry envelope.                      | [`PumpOptions`], [`OpenRetryPolicy`]       |
//!
//! ## Optional features
//! - `logging`: exports a built-in tracing-backed [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventpump::transport::mock::MockTransport;
//! use eventpump::{
//!     CloseReason, Cursor, EventData, Lease, PartitionContext, PartitionPump, ProcessorFn,
//!     PumpStatus,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(MockTransport::new());
//!     let lease = Arc::new(Lease::new("0", "host-a", 3));
//!     let ctx = Arc::new(PartitionContext::new(
//!         "host-a",
//!         "$Default",
//!         "0",
//!         Some(Cursor::token("T1")),
//!     ));
//!     let processor = ProcessorFn::arc(|_ctx: &PartitionContext, batch: Vec<EventData>| async move {
//!         println!("got {} events", batch.len());
//!         Ok(())
//!     });
//!
//!     let pump = PartitionPump::builder(transport.clone(), lease, ctx, processor).build()?;
//!     assert_eq!(pump.start().await, PumpStatus::Running);
//!
//!     let receiver = transport.last_receiver().expect("receiver opened");
//!     receiver.deliver(Some(vec![EventData::new("hello", 1, "100")])).await;
//!
//!     pump.shutdown(CloseReason::LeaseLost).await;
//!     assert_eq!(pump.status(), PumpStatus::Closed);
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod events;
mod executor;
mod model;
mod policies;
mod processor;
mod pump;
mod renewal;
mod subscribers;
pub mod transport;

// ---- Public re-exports ----

pub use config::PumpOptions;
pub use error::{
    ConfigError, OpenError, ProcessorError, PumpError, RenewalError, TransportError,
    TransportErrorKind,
};
pub use events::{Bus, Event, EventKind};
pub use executor::{Deferred, Executor, TokioExecutor};
pub use model::{Cursor, EventData, Lease, PartitionContext, ReceiverRuntimeInfo};
pub use policies::OpenRetryPolicy;
pub use processor::{CloseReason, EventProcessor, ProcessorFn};
pub use pump::{ConnectionHandle, PartitionPump, PartitionPumpBuilder, PumpStatus};
pub use renewal::{ClientEntity, Renew, RenewFn, RenewalScheduler};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose the built-in tracing-backed logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
