//! Partition pump: open, deliver, shut down.
//!
//! ## Contents
//! - [`PartitionPump`] lifecycle and shutdown of one leased partition
//! - [`PartitionPumpBuilder`] validated construction
//! - [`PumpStatus`] lifecycle state
//! - [`ConnectionHandle`] the client/receiver pair a running pump owns
//!
//! ## Wiring
//! ```text
//! PartitionPump ──► ReceiverDriver ──► ConnectionOpener ──► Transport / TransportClient
//!       ▲                 │
//!       │                 └─ set_receive_handler(DeliveryBridge)
//!       │                                   │
//!       └──── on_events / deferred error ◄──┘
//! ```

mod bridge;
mod builder;
mod driver;
mod inflight;
mod opener;
mod partition_pump;
mod receiver_driver;
mod status;

pub use builder::PartitionPumpBuilder;
pub use opener::ConnectionHandle;
pub use partition_pump::PartitionPump;
pub use status::PumpStatus;
