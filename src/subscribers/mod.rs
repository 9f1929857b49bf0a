//! # Event subscribers.
//!
//! [`Subscribe`] and [`SubscriberSet`] consume the events pumps and renewal timers
//! publish on a [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//!   PartitionPump ─┐
//!   PartitionPump ─┼─ publish(Event) ──► Bus ──► SubscriberSet::attach listener
//!   Renewal ───────┘                                  │
//!                                            ┌────────┼─────────┐
//!                                            ▼        ▼         ▼
//!                                        LogWriter  Metrics   Custom
//! ```
//!
//! A host typically shares one bus across all its pumps
//! ([`PartitionPumpBuilder::bus`](crate::PartitionPumpBuilder::bus)) and attaches a single
//! subscriber set to it.

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
