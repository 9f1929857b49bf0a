mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use eventpump::{CloseReason, EventKind, PumpOptions, RenewFn, RenewalError, RenewalScheduler};

use common::Fixture;

#[tokio::test(start_paused = true)]
async fn renewal_stops_once_the_pump_closes() {
    let fx = Fixture::new(PumpOptions::default());
    fx.pump.start().await;
    let mut rx = fx.pump.subscribe();

    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    let action = RenewFn::arc(move || {
        let f = f.clone();
        async move {
            f.fetch_add(1, Ordering::SeqCst);
            Ok::<(), RenewalError>(())
        }
    });
    let sched = RenewalScheduler::start_with_bus(
        Arc::new(fx.pump.clone()),
        Duration::from_secs(10),
        action,
        fx.pump.bus().clone(),
    );

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 2);

    fx.pump.shutdown(CloseReason::LeaseLost).await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(fired.load(Ordering::SeqCst), 2);
    assert!(!sched.is_pending());

    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        kinds.push(ev.kind);
    }
    assert_eq!(
        kinds.iter().filter(|k| **k == EventKind::RenewalFired).count(),
        2
    );
    assert_eq!(kinds.last(), Some(&EventKind::RenewalStopped));
}
