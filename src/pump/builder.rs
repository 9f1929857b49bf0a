use std::sync::Arc;

use crate::config::PumpOptions;
use crate::error::ConfigError;
use crate::events::Bus;
use crate::executor::{Executor, TokioExecutor};
use crate::model::{Lease, PartitionContext};
use crate::processor::EventProcessor;
use crate::pump::partition_pump::PartitionPump;
use crate::pump::receiver_driver::ReceiverDriver;
use crate::transport::Transport;

/// Builder for a [`PartitionPump`] backed by an epoch-receiver transport.
pub struct PartitionPumpBuilder<T: Transport> {
    transport: Arc<T>,
    lease: Arc<Lease>,
    context: Arc<PartitionContext>,
    processor: Arc<dyn EventProcessor>,
    options: PumpOptions,
    executor: Option<Arc<dyn Executor>>,
    bus: Option<Bus>,
}

impl<T: Transport> PartitionPumpBuilder<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        lease: Arc<Lease>,
        context: Arc<PartitionContext>,
        processor: Arc<dyn EventProcessor>,
    ) -> Self {
        Self {
            transport,
            lease,
            context,
            processor,
            options: PumpOptions::default(),
            executor: None,
            bus: None,
        }
    }

    /// Replaces the default options.
    pub fn options(mut self, options: PumpOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets where error-triggered teardown runs.
    ///
    /// Defaults to a [`TokioExecutor`] on the runtime `build` is called from.
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Publishes into an existing bus (typically one shared by every pump of a host).
    ///
    /// Defaults to a private bus sized by `options.bus_capacity`.
    pub fn bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Validates the options and assembles the pump.
    pub fn build(self) -> Result<PartitionPump, ConfigError> {
        self.options.validate()?;
        let executor = match self.executor {
            Some(e) => e,
            None => Arc::new(TokioExecutor::current().ok_or(ConfigError::NoExecutor)?),
        };
        let bus = self
            .bus
            .unwrap_or_else(|| Bus::new(self.options.bus_capacity_clamped()));
        let driver = Arc::new(ReceiverDriver::new(self.transport));

        Ok(PartitionPump::assemble(
            self.context,
            self.lease,
            self.options,
            self.processor,
            bus,
            executor,
            driver,
        ))
    }
}

impl PartitionPump {
    /// Starts building a pump for `lease` / `context` that reads through `transport`.
    ///
    /// # Example
    /// ```no_run
    /// use std::sync::Arc;
    /// use eventpump::{Cursor, EventData, Lease, PartitionContext, PartitionPump, ProcessorFn, PumpOptions};
    /// use eventpump::transport::mock::MockTransport;
    ///
    /// # async fn run() -> Result<(), eventpump::ConfigError> {
    /// let lease = Arc::new(Lease::new("0", "host-a", 1));
    /// let ctx = Arc::new(PartitionContext::new("host-a", "$Default", "0", Some(Cursor::token("-1"))));
    /// let processor = ProcessorFn::arc(|_ctx: &PartitionContext, batch: Vec<EventData>| async move {
    ///     println!("{} events", batch.len());
    ///     Ok(())
    /// });
    ///
    /// let pump = PartitionPump::builder(Arc::new(MockTransport::new()), lease, ctx, processor)
    ///     .options(PumpOptions::default().with_empty_batches(true))
    ///     .build()?;
    /// pump.start().await;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder<T: Transport>(
        transport: Arc<T>,
        lease: Arc<Lease>,
        context: Arc<PartitionContext>,
        processor: Arc<dyn EventProcessor>,
    ) -> PartitionPumpBuilder<T> {
        PartitionPumpBuilder::new(transport, lease, context, processor)
    }
}
