//! # PartitionPump: per-partition lifecycle.
//!
//! A pump is created per leased partition by the host's orchestrator, started once, and
//! shut down once (by the orchestrator, on lease loss, or by itself after a transport error).
//!
//! ## Start
//! ```text
//! start()
//!   ├─► Uninitialized → Opening, publish PumpOpening
//!   ├─► processor.on_open(ctx)
//!   │       ├─ Err ─► on_error(OnOpen), OpenFailed → Closing → Closed
//!   │       └─ Ok after shutdown finished ─► on_close(ctx, reason)
//!   └─► driver.start(pump)
//!           ├─ opened    ─► Running, handler installed
//!           ├─ failed    ─► on_error(Open) once, OpenFailed → Closing → teardown → Closed
//!           └─ cancelled ─► (shutdown owns the rest)
//! ```
//!
//! ## Shutdown
//! ```text
//! shutdown(reason)        first caller runs it, concurrent callers wait for it
//!   ├─► cancel shutdown token (cancels any in-flight open attempt)
//!   ├─► wait ≤ cancel_grace for a running start() to settle
//!   ├─► driver.shutdown(pump, reason)   → Closing, teardown
//!   ├─► processor.on_close(ctx, reason) if on_open succeeded
//!   └─► Closed, publish PumpClosed
//! ```
//!
//! ## Rules
//! - `shutdown` must not be awaited from inside `on_events`: teardown waits for the
//!   in-flight delivery to return.
//! - A transport error never runs teardown on the delivery task; the bridge hands it to the
//!   pump's [`Executor`].

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{OnceCell, broadcast, watch};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PumpOptions;
use crate::error::{OpenError, PumpError, TransportError};
use crate::events::{Bus, Event, EventKind};
use crate::executor::Executor;
use crate::model::{EventData, Lease, PartitionContext};
use crate::processor::{CloseReason, EventProcessor};
use crate::pump::driver::PumpDriver;
use crate::pump::status::{PumpStatus, StatusCell};

/// Progress of `start()`, observed by shutdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpenPhase {
    Idle,
    Opening,
    Settled,
}

pub(crate) struct PumpShared {
    pub(crate) context: Arc<PartitionContext>,
    pub(crate) lease: Arc<Lease>,
    pub(crate) options: PumpOptions,
    pub(crate) processor: Arc<dyn EventProcessor>,
    pub(crate) bus: Bus,
    pub(crate) executor: Arc<dyn Executor>,
    pub(crate) status: StatusCell,
    driver: Arc<dyn PumpDriver>,
    shutdown_token: CancellationToken,
    shutdown_done: OnceCell<()>,
    phase: watch::Sender<OpenPhase>,
    close_hook: Mutex<CloseHook>,
}

/// Handle to one partition's pump. Cheap to clone.
#[derive(Clone)]
pub struct PartitionPump {
    inner: Arc<PumpShared>,
}

/// Whether `on_open` succeeded, and the reason shutdown passed the `on_close` step with.
///
/// Both sides take the lock, so `on_close` runs exactly once after a successful `on_open`
/// even when `on_open` outlives the cancellation grace.
#[derive(Default)]
struct CloseHook {
    opened: bool,
    passed: Option<CloseReason>,
}

/// Sets the open phase to `Settled` however `start()` exits.
struct SettleOnDrop<'a>(&'a watch::Sender<OpenPhase>);

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(OpenPhase::Settled);
    }
}

impl PartitionPump {
    pub(crate) fn assemble(
        context: Arc<PartitionContext>,
        lease: Arc<Lease>,
        options: PumpOptions,
        processor: Arc<dyn EventProcessor>,
        bus: Bus,
        executor: Arc<dyn Executor>,
        driver: Arc<dyn PumpDriver>,
    ) -> Self {
        let (phase, _) = watch::channel(OpenPhase::Idle);
        Self {
            inner: Arc::new(PumpShared {
                context,
                lease,
                options,
                processor,
                bus,
                executor,
                status: StatusCell::new(PumpStatus::Uninitialized),
                driver,
                shutdown_token: CancellationToken::new(),
                shutdown_done: OnceCell::new(),
                phase,
                close_hook: Mutex::new(CloseHook::default()),
            }),
        }
    }

    /// Opens the pump. Returns the status reached: `Running` on success, `Closed` if the open
    /// failed, or whatever shutdown left behind if it raced the open.
    ///
    /// Only the first call does anything.
    pub async fn start(&self) -> PumpStatus {
        let me = &self.inner;
        if me.shutdown_token.is_cancelled()
            || !me.status.transition(PumpStatus::Uninitialized, PumpStatus::Opening)
        {
            warn!(
                host = self.host_name(),
                partition = self.partition_id(),
                status = %self.status(),
                "start ignored"
            );
            return self.status();
        }
        me.phase.send_replace(OpenPhase::Opening);
        let _settle = SettleOnDrop(&me.phase);
        // shutdown cancels before reading the phase; past this check it waits for us
        if me.shutdown_token.is_cancelled() {
            return self.status();
        }

        info!(
            host = self.host_name(),
            partition = self.partition_id(),
            epoch = me.lease.epoch(),
            driver = me.driver.kind(),
            "opening pump"
        );
        me.bus.publish(
            Event::new(EventKind::PumpOpening)
                .with_partition(self.partition_id())
                .with_epoch(me.lease.epoch()),
        );

        if let Err(e) = me.processor.on_open(&me.context).await {
            warn!(
                host = self.host_name(),
                partition = self.partition_id(),
                error = %e,
                "on_open failed"
            );
            me.processor
                .on_error(&me.context, &PumpError::OnOpen(e.clone()))
                .await;
            if me.status.transition(PumpStatus::Opening, PumpStatus::OpenFailed) {
                me.bus.publish(
                    Event::new(EventKind::OpenFailed)
                        .with_partition(self.partition_id())
                        .with_reason(e.to_string()),
                );
                me.status.set(PumpStatus::Closing);
                me.bus.publish(
                    Event::new(EventKind::PumpClosing)
                        .with_partition(self.partition_id())
                        .with_reason("on_open_failed"),
                );
                self.mark_closed();
            }
            return self.status();
        }

        let late_close = {
            let mut hook = me.close_hook.lock();
            hook.opened = true;
            hook.passed
        };
        if let Some(reason) = late_close {
            info!(
                host = self.host_name(),
                partition = self.partition_id(),
                %reason,
                "on_open returned after shutdown, closing processor"
            );
            me.processor.on_close(&me.context, reason).await;
            return self.status();
        }

        if me.shutdown_token.is_cancelled() {
            debug!(
                host = self.host_name(),
                partition = self.partition_id(),
                "shutdown requested during on_open"
            );
            return self.status();
        }

        me.driver.start(self).await;
        self.status()
    }

    /// Shuts the pump down. Safe to call at any time, any number of times, concurrently with
    /// `start`; the first call does the work and later calls wait for it to finish.
    pub async fn shutdown(&self, reason: CloseReason) {
        self.inner
            .shutdown_done
            .get_or_init(|| self.run_shutdown(reason))
            .await;
    }

    async fn run_shutdown(&self, reason: CloseReason) {
        let me = &self.inner;
        info!(
            host = self.host_name(),
            partition = self.partition_id(),
            %reason,
            status = %self.status(),
            "pump shutdown requested"
        );
        me.shutdown_token.cancel();

        if self.status() == PumpStatus::Closed {
            debug!(
                host = self.host_name(),
                partition = self.partition_id(),
                "pump already closed"
            );
            return;
        }

        self.wait_for_open_to_settle().await;
        if self.status() == PumpStatus::Closed {
            // the open failed and closed the pump while we waited
            return;
        }

        me.bus.publish(
            Event::new(EventKind::PumpClosing)
                .with_partition(self.partition_id())
                .with_reason(reason.as_label()),
        );
        me.driver.shutdown(self, reason).await;

        let opened = {
            let mut hook = me.close_hook.lock();
            hook.passed = Some(reason);
            hook.opened
        };
        if opened {
            me.processor.on_close(&me.context, reason).await;
        }
        self.mark_closed();
    }

    async fn wait_for_open_to_settle(&self) {
        let mut phase = self.inner.phase.subscribe();
        let opening = *phase.borrow() == OpenPhase::Opening;
        if !opening {
            return;
        }
        let grace = self.inner.options.cancel_grace;
        let settled = time::timeout(grace, phase.wait_for(|p| *p != OpenPhase::Opening))
            .await
            .is_ok();
        if !settled {
            warn!(
                host = self.host_name(),
                partition = self.partition_id(),
                ?grace,
                "open did not settle within cancellation grace, tearing down anyway"
            );
        }
    }

    /// Current status.
    pub fn status(&self) -> PumpStatus {
        self.inner.status.get()
    }

    /// `true` only while deliveries are expected.
    pub fn is_running(&self) -> bool {
        self.status() == PumpStatus::Running
    }

    pub fn context(&self) -> &Arc<PartitionContext> {
        &self.inner.context
    }

    pub fn lease(&self) -> &Arc<Lease> {
        &self.inner.lease
    }

    pub fn options(&self) -> &PumpOptions {
        &self.inner.options
    }

    pub fn partition_id(&self) -> &str {
        self.inner.context.partition_id()
    }

    pub fn host_name(&self) -> &str {
        self.inner.context.host_name()
    }

    /// The bus this pump publishes to.
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    /// Shorthand for `bus().subscribe()`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    // ---- driver/bridge side ----

    pub(crate) fn shared(&self) -> &PumpShared {
        &self.inner
    }

    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown_token
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.inner.shutdown_token.is_cancelled()
    }

    pub(crate) fn downgrade(&self) -> Weak<PumpShared> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<PumpShared>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Reports an open failure to the processor once and moves `Opening → OpenFailed`.
    ///
    /// Returns `false` (and reports nothing) if shutdown already owns the status.
    pub(crate) async fn report_open_failure(&self, err: OpenError) -> bool {
        let me = &self.inner;
        warn!(
            host = self.host_name(),
            partition = self.partition_id(),
            error = %err,
            label = err.as_label(),
            "open failed"
        );
        if me.shutdown_token.is_cancelled() {
            return false;
        }
        // on_open has returned, so the error goes to the processor, not the runtime error path.
        me.processor
            .on_error(&me.context, &PumpError::Open(err.clone()))
            .await;
        if !me.status.transition(PumpStatus::Opening, PumpStatus::OpenFailed) {
            return false;
        }
        me.bus.publish(
            Event::new(EventKind::OpenFailed)
                .with_partition(self.partition_id())
                .with_reason(err.to_string()),
        );
        true
    }

    pub(crate) fn mark_closed(&self) {
        self.inner.status.set(PumpStatus::Closed);
        info!(
            host = self.host_name(),
            partition = self.partition_id(),
            "pump closed"
        );
        self.inner
            .bus
            .publish(Event::new(EventKind::PumpClosed).with_partition(self.partition_id()));
    }

    /// Batch handler: forwards one delivery to the processor.
    pub(crate) async fn on_events(&self, batch: Vec<EventData>) {
        let me = &self.inner;
        if self.status().is_closing_or_closed() {
            debug!(
                host = self.host_name(),
                partition = self.partition_id(),
                count = batch.len(),
                "dropping delivery during shutdown"
            );
            return;
        }
        let count = batch.len();
        match me.processor.on_events(&me.context, batch).await {
            Ok(()) => {
                me.bus.publish(
                    Event::new(EventKind::BatchDelivered)
                        .with_partition(self.partition_id())
                        .with_count(count),
                );
            }
            Err(e) => {
                warn!(
                    host = self.host_name(),
                    partition = self.partition_id(),
                    count,
                    error = %e,
                    "on_events failed"
                );
                me.processor
                    .on_error(&me.context, &PumpError::Processor(e))
                    .await;
            }
        }
    }

    /// Deferred half of a transport error: runs on the executor, never on the delivery task.
    pub(crate) async fn handle_delivery_error(&self, error: TransportError) {
        let me = &self.inner;
        me.processor
            .on_error(&me.context, &PumpError::Delivery(error))
            .await;
        self.shutdown(CloseReason::Shutdown).await;
    }
}

impl std::fmt::Debug for PartitionPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionPump")
            .field("host", &self.host_name())
            .field("partition", &self.partition_id())
            .field("status", &self.status())
            .finish()
    }
}
