//! # Example: partition_host
//!
//! Runs three partition pumps against the in-memory transport, the way a host's
//! orchestrator would after acquiring their leases.
//!
//! Shows how to:
//! - Share one [`Bus`] between pumps and attach a [`SubscriberSet`] with [`LogWriter`].
//! - Survive transient open failures and a fencing conflict.
//! - Keep credentials fresh with a [`RenewalScheduler`] owned by a pump.
//! - Shut pumps down on lease loss.
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example partition_host --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use eventpump::transport::mock::{MockTransport, Step};
use eventpump::{
    Bus, CloseReason, Cursor, EventData, Lease, LogWriter, PartitionContext, PartitionPump,
    ProcessorFn, PumpOptions, RenewFn, RenewalError, RenewalScheduler, Subscribe, SubscriberSet,
    TransportError,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bus = Bus::new(256);
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let set = Arc::new(SubscriberSet::new(subs));
    let _listener = set.attach(&bus);

    let transport = Arc::new(MockTransport::new());
    // partition 0: two refusals then success; partition 1: fenced by another host
    transport.script_receivers([
        Step::Fail(TransportError::connection("connection refused")),
        Step::Fail(TransportError::connection("connection refused")),
        Step::Ok,
        Step::Fail(TransportError::fenced("receiver with epoch 9 already active")),
    ]);

    let processor = ProcessorFn::arc(|ctx: &PartitionContext, batch: Vec<EventData>| {
        let partition = ctx.partition_id().to_string();
        async move {
            for ev in &batch {
                println!(
                    "[app] partition={partition} seq={} body={}",
                    ev.sequence_number,
                    String::from_utf8_lossy(&ev.body)
                );
            }
            Ok(())
        }
    });
    let options = PumpOptions::default().with_empty_batches(true);

    let mut pumps = Vec::new();
    for partition in ["0", "1", "2"] {
        let lease = Arc::new(Lease::new(partition, "host-a", 3));
        let ctx = Arc::new(PartitionContext::new(
            "host-a",
            "$Default",
            partition,
            Some(Cursor::token("-1")),
        ));
        let pump = PartitionPump::builder(transport.clone(), lease, ctx, processor.clone())
            .options(options.clone())
            .bus(bus.clone())
            .build()?;
        let status = pump.start().await;
        println!("[host] partition={partition} status={status}");
        pumps.push(pump);
    }

    let renewal = RenewalScheduler::start_with_bus(
        Arc::new(pumps[0].clone()),
        Duration::from_millis(200),
        RenewFn::arc(|| async { Ok::<(), RenewalError>(()) }),
        bus.clone(),
    );

    for receiver in transport.receivers() {
        receiver
            .deliver(Some(vec![
                EventData::new("hello", 1, "100"),
                EventData::new("world", 2, "200"),
            ]))
            .await;
        receiver.deliver(None).await;
    }

    tokio::time::sleep(Duration::from_millis(500)).await;

    for pump in &pumps {
        pump.shutdown(CloseReason::LeaseLost).await;
    }
    renewal.cancel();

    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
