//! # Application processor hooks.
//!
//! [`EventProcessor`] is what the application implements. A pump calls:
//! ```text
//! on_open(ctx)            once, before the receiver handler is installed
//! on_events(ctx, batch)   per delivery, sequential, batch may be empty
//! on_error(ctx, err)      open failures (once) and runtime errors
//! on_close(ctx, reason)   once during shutdown, only if on_open succeeded
//! ```
//!
//! `on_events` runs on the transport's delivery task: the receiver does not fetch the
//! next batch until it returns.
//!
//! [`ProcessorFn`] wraps a closure for the common "only on_events matters" case.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventpump::{EventData, EventProcessor, PartitionContext, ProcessorFn};
//!
//! let p: Arc<dyn EventProcessor> = ProcessorFn::arc(|ctx: &PartitionContext, batch: Vec<EventData>| {
//!     let partition = ctx.partition_id().to_string();
//!     async move {
//!         println!("partition {partition}: {} events", batch.len());
//!         Ok(())
//!     }
//! });
//! # let _ = p;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ProcessorError, PumpError};
use crate::model::{EventData, PartitionContext};

/// Why a pump is being shut down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The host lost the partition's lease (another host took it, or renewal failed).
    LeaseLost,
    /// Host shutdown, or the pump is being torn down after an error.
    Shutdown,
}

impl CloseReason {
    pub fn as_label(&self) -> &'static str {
        match self {
            CloseReason::LeaseLost => "lease_lost",
            CloseReason::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Application logic for one partition.
#[async_trait]
pub trait EventProcessor: Send + Sync + 'static {
    /// Called once before deliveries start. An error aborts the open.
    async fn on_open(&self, _ctx: &PartitionContext) -> Result<(), ProcessorError> {
        Ok(())
    }

    /// Handles one batch. An error is reported to [`on_error`](Self::on_error); the pump keeps running.
    async fn on_events(
        &self,
        ctx: &PartitionContext,
        batch: Vec<EventData>,
    ) -> Result<(), ProcessorError>;

    /// Called once during shutdown when `on_open` had succeeded.
    async fn on_close(&self, _ctx: &PartitionContext, _reason: CloseReason) {}

    /// Reports an error affecting this partition.
    async fn on_error(&self, _ctx: &PartitionContext, _error: &PumpError) {}
}

/// Function-backed processor: only `on_events` does work.
pub struct ProcessorFn<F> {
    f: F,
}

impl<F, Fut> ProcessorFn<F>
where
    F: Fn(&PartitionContext, Vec<EventData>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcessorError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the processor and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> EventProcessor for ProcessorFn<F>
where
    F: Fn(&PartitionContext, Vec<EventData>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcessorError>> + Send + 'static,
{
    async fn on_events(
        &self,
        ctx: &PartitionContext,
        batch: Vec<EventData>,
    ) -> Result<(), ProcessorError> {
        (self.f)(ctx, batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn processor_fn_forwards_batches() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in = seen.clone();
        let p = ProcessorFn::arc(move |_ctx: &PartitionContext, batch: Vec<EventData>| {
            let seen = seen_in.clone();
            async move {
                seen.fetch_add(batch.len(), Ordering::SeqCst);
                Ok(())
            }
        });

        let ctx = PartitionContext::new("h", "g", "0", None);
        let batch = vec![EventData::new("a", 1, "1"), EventData::new("b", 2, "2")];
        p.on_events(&ctx, batch).await.unwrap();
        p.on_open(&ctx).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn close_reason_labels() {
        assert_eq!(CloseReason::LeaseLost.to_string(), "lease_lost");
        assert_eq!(CloseReason::Shutdown.as_label(), "shutdown");
    }
}
