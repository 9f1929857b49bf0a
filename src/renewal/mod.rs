//! Periodic token renewal tied to the lifetime of a client entity.
//!
//! ## Contents
//! - [`RenewalScheduler`] self-rescheduling one-shot timer
//! - [`ClientEntity`] the owner whose liveness gates each firing
//! - [`Renew`], [`RenewFn`] the renewal action
//!
//! ```text
//! start(owner, interval, action)
//!   └─► [interval] ─► fire ─┬─ owner closing/closed ─► stop (terminal)
//!                           └─ active ─► action.renew().await ─► schedule [interval] ─► ...
//! cancel() ─► no timer pending, none created afterwards
//! ```

mod scheduler;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RenewalError;
use crate::pump::PartitionPump;

pub use scheduler::RenewalScheduler;

/// Something whose credentials need refreshing while it is open.
pub trait ClientEntity: Send + Sync + 'static {
    /// Identifier used in logs and events.
    fn client_id(&self) -> &str;

    /// `true` once the entity started closing; renewal stops at the next firing.
    fn is_closing_or_closed(&self) -> bool;
}

impl ClientEntity for PartitionPump {
    fn client_id(&self) -> &str {
        self.partition_id()
    }

    fn is_closing_or_closed(&self) -> bool {
        self.status().is_closing_or_closed()
    }
}

/// A renewal action.
#[async_trait]
pub trait Renew: Send + Sync + 'static {
    async fn renew(&self) -> Result<(), RenewalError>;
}

/// Closure-backed [`Renew`].
///
/// # Example
/// ```
/// use eventpump::{RenewFn, RenewalError};
///
/// let action = RenewFn::arc(|| async { Ok::<(), RenewalError>(()) });
/// # let _ = action;
/// ```
pub struct RenewFn<F> {
    f: F,
}

impl<F, Fut> RenewFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), RenewalError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }

    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Renew for RenewFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), RenewalError>> + Send + 'static,
{
    async fn renew(&self) -> Result<(), RenewalError> {
        (self.f)().await
    }
}
