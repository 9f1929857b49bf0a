//! # RenewalScheduler: one-shot timer that re-arms itself.
//!
//! ## Firing
//! ```text
//! timer task wakes
//!   ├─► lock(slot): pending = None; cancelled? → return
//!   ├─► owner.is_closing_or_closed()? → info!, publish RenewalStopped, return (terminal)
//!   ├─► action.renew().await           (failure → warn!, schedule continues)
//!   └─► lock(slot): cancelled? → return, else pending = spawn(sleep(interval) → fire)
//! ```
//!
//! ## Rules
//! - `cancel()` and re-arming take the same lock, so after `cancel()` returns no timer is
//!   pending and none will be created.
//! - A firing removes itself from the slot before running the action; `cancel()` therefore
//!   never aborts an action mid-flight, it only prevents the next one.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::events::{Bus, Event, EventKind};
use crate::renewal::{ClientEntity, Renew};

#[derive(Default)]
struct TimerSlot {
    pending: Option<AbortHandle>,
    cancelled: bool,
}

struct Inner {
    owner: Arc<dyn ClientEntity>,
    action: Arc<dyn Renew>,
    interval: Duration,
    bus: Option<Bus>,
    timer: Mutex<TimerSlot>,
}

/// Handle to a running renewal schedule.
///
/// Dropping the handle does not stop the schedule; call [`cancel`](Self::cancel) or let the
/// owner close.
pub struct RenewalScheduler {
    inner: Arc<Inner>,
}

impl RenewalScheduler {
    /// Arms the first firing `interval` from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        owner: Arc<dyn ClientEntity>,
        interval: Duration,
        action: Arc<dyn Renew>,
    ) -> Self {
        Self::start_inner(owner, interval, action, None)
    }

    /// Like [`start`](Self::start), and publishes `RenewalFired` / `RenewalStopped` on `bus`.
    pub fn start_with_bus(
        owner: Arc<dyn ClientEntity>,
        interval: Duration,
        action: Arc<dyn Renew>,
        bus: Bus,
    ) -> Self {
        Self::start_inner(owner, interval, action, Some(bus))
    }

    fn start_inner(
        owner: Arc<dyn ClientEntity>,
        interval: Duration,
        action: Arc<dyn Renew>,
        bus: Option<Bus>,
    ) -> Self {
        let inner = Arc::new(Inner {
            owner,
            action,
            interval,
            bus,
            timer: Mutex::new(TimerSlot::default()),
        });
        debug!(client = inner.owner.client_id(), ?interval, "renewal scheduled");
        arm(&inner);
        Self { inner }
    }

    /// Stops the schedule. An action already running completes; nothing fires afterwards.
    pub fn cancel(&self) {
        let mut slot = self.inner.timer.lock();
        slot.cancelled = true;
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
    }

    /// `true` while a future firing is armed.
    pub fn is_pending(&self) -> bool {
        self.inner.timer.lock().pending.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }
}

impl std::fmt::Debug for RenewalScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenewalScheduler")
            .field("client", &self.inner.owner.client_id())
            .field("interval", &self.inner.interval)
            .field("pending", &self.is_pending())
            .finish()
    }
}

fn arm(inner: &Arc<Inner>) {
    let mut slot = inner.timer.lock();
    if slot.cancelled {
        return;
    }
    let me = Arc::clone(inner);
    let task = tokio::spawn(async move {
        tokio::time::sleep(me.interval).await;
        fire(me).await;
    });
    slot.pending = Some(task.abort_handle());
}

fn fire(inner: Arc<Inner>) -> BoxFuture<'static, ()> {
    async move {
        {
            let mut slot = inner.timer.lock();
            slot.pending = None;
            if slot.cancelled {
                return;
            }
        }

        let client = inner.owner.client_id();
        if inner.owner.is_closing_or_closed() {
            info!(client, "client closing or closed, stopping token renewal");
            publish(&inner, EventKind::RenewalStopped, Some("owner closed".to_string()));
            return;
        }

        let failure = match inner.action.renew().await {
            Ok(()) => None,
            Err(e) => {
                warn!(client, error = %e, "token renewal failed, will retry at next interval");
                Some(e.to_string())
            }
        };
        publish(&inner, EventKind::RenewalFired, failure);

        arm(&inner);
    }
    .boxed()
}

fn publish(inner: &Inner, kind: EventKind, reason: Option<String>) {
    let Some(bus) = &inner.bus else {
        return;
    };
    let mut ev = Event::new(kind).with_partition(inner.owner.client_id());
    if let Some(reason) = reason {
        ev = ev.with_reason(reason);
    }
    bus.publish(ev);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use crate::error::RenewalError;
    use crate::renewal::RenewFn;

    struct Owner {
        closed: AtomicBool,
    }

    impl Owner {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                closed: AtomicBool::new(false),
            })
        }
    }

    impl ClientEntity for Owner {
        fn client_id(&self) -> &str {
            "client-1"
        }

        fn is_closing_or_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    fn counting(fired: &Arc<AtomicUsize>) -> Arc<dyn Renew> {
        let fired = Arc::clone(fired);
        RenewFn::arc(move || {
            let fired = Arc::clone(&fired);
            async move {
                fired.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    /// Lets spawned timer tasks run to their next await point.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_every_interval_while_owner_is_active() {
        let fired = Arc::new(AtomicUsize::new(0));
        let sched =
            RenewalScheduler::start(Owner::new(), Duration::from_secs(10), counting(&fired));

        tokio::time::sleep(Duration::from_secs(35)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert!(sched.is_pending());
        sched.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn inactive_owner_stops_without_cancel() {
        let fired = Arc::new(AtomicUsize::new(0));
        let owner = Owner::new();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let sched = RenewalScheduler::start_with_bus(
            owner.clone(),
            Duration::from_secs(10),
            counting(&fired),
            bus,
        );

        tokio::time::sleep(Duration::from_secs(15)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        owner.closed.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(100)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!sched.is_pending());

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RenewalFired);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RenewalStopped);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_action_keeps_the_schedule() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = attempts.clone();
        let action = RenewFn::arc(move || {
            let a = a.clone();
            async move {
                a.fetch_add(1, Ordering::SeqCst);
                Err(RenewalError::new("token endpoint unavailable"))
            }
        });
        let sched = RenewalScheduler::start(Owner::new(), Duration::from_secs(1), action);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        settle().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(sched.is_pending());
        sched.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_action_leaves_no_timer() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let done = Arc::new(AtomicUsize::new(0));

        let (e, r, d) = (entered.clone(), release.clone(), done.clone());
        let action = RenewFn::arc(move || {
            let (e, r, d) = (e.clone(), r.clone(), d.clone());
            async move {
                e.notify_one();
                r.notified().await;
                d.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        let sched = RenewalScheduler::start(Owner::new(), Duration::from_secs(5), action);

        entered.notified().await;
        // the firing is about to re-arm once the action returns
        assert!(!sched.is_pending());
        sched.cancel();
        release.notify_one();
        settle().await;

        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert!(!sched.is_pending());
        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_first_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let sched =
            RenewalScheduler::start(Owner::new(), Duration::from_secs(10), counting(&fired));
        assert!(sched.is_pending());

        sched.cancel();
        assert!(!sched.is_pending());
        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
