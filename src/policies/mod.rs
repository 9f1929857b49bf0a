//! Retry policies.
//!
//! ## Contents
//! - [`OpenRetryPolicy`] how many open attempts a pump makes and how it paces them
//!
//! ## Quick wiring
//! ```text
//! PumpOptions { open_retry: OpenRetryPolicy, .. }
//!      └─► pump::opener::ConnectionOpener uses:
//!           - allows(attempts) to decide whether to try again
//!           - delay(attempt) to wait between transient failures
//! ```

mod retry;

pub use retry::OpenRetryPolicy;
