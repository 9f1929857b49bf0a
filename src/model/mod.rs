//! Data model shared between the pump, the transport and the application.
//!
//! - [`Lease`] partition ownership record carrying the fencing epoch
//! - [`PartitionContext`] per-partition identity, starting [`Cursor`] and runtime info
//! - [`EventData`] one delivered event

mod context;
mod event_data;
mod lease;

pub use context::{Cursor, PartitionContext, ReceiverRuntimeInfo};
pub use event_data::EventData;
pub use lease::Lease;
