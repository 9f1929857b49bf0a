//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `PartitionPump`, `ReceiverDriver`, `ConnectionOpener`, `DeliveryBridge`,
//!   `RenewalScheduler`.
//! - **Consumers**: [`SubscriberSet`](crate::SubscriberSet) workers, or any caller of `Bus::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
