#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use eventpump::transport::mock::MockTransport;
use eventpump::{
    CloseReason, Cursor, EventData, EventProcessor, Lease, PartitionContext, PartitionPump,
    ProcessorError, PumpError, PumpOptions,
};

pub const HOST: &str = "host-a";
pub const GROUP: &str = "$Default";
pub const PARTITION: &str = "7";

/// Processor that records every hook call.
#[derive(Default)]
pub struct Recording {
    pub opens: Mutex<usize>,
    pub batches: Mutex<Vec<Vec<EventData>>>,
    pub errors: Mutex<Vec<&'static str>>,
    pub closes: Mutex<Vec<CloseReason>>,
    pub batches_done: Mutex<usize>,
    pub fail_open: bool,
    pub fail_events: bool,
    pub hang_open: bool,
    pub open_delay: Option<Duration>,
    pub events_delay: Option<Duration>,
}

impl Recording {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_open() -> Arc<Self> {
        Arc::new(Self {
            fail_open: true,
            ..Self::default()
        })
    }

    pub fn failing_events() -> Arc<Self> {
        Arc::new(Self {
            fail_events: true,
            ..Self::default()
        })
    }

    pub fn hanging_open() -> Arc<Self> {
        Arc::new(Self {
            hang_open: true,
            ..Self::default()
        })
    }

    pub fn slow_open(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            open_delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn slow_events(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            events_delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn errors(&self) -> Vec<&'static str> {
        self.errors.lock().clone()
    }

    pub fn closes(&self) -> Vec<CloseReason> {
        self.closes.lock().clone()
    }

    pub fn batches(&self) -> Vec<Vec<EventData>> {
        self.batches.lock().clone()
    }

    pub fn opens(&self) -> usize {
        *self.opens.lock()
    }

    /// Batches whose `on_events` call has returned.
    pub fn batches_done(&self) -> usize {
        *self.batches_done.lock()
    }
}

#[async_trait]
impl EventProcessor for Recording {
    async fn on_open(&self, _ctx: &PartitionContext) -> Result<(), ProcessorError> {
        *self.opens.lock() += 1;
        if self.hang_open {
            futures::future::pending::<()>().await;
        }
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_open {
            return Err(ProcessorError::new("checkpoint store unreachable"));
        }
        Ok(())
    }

    async fn on_events(
        &self,
        _ctx: &PartitionContext,
        batch: Vec<EventData>,
    ) -> Result<(), ProcessorError> {
        self.batches.lock().push(batch);
        if let Some(delay) = self.events_delay {
            tokio::time::sleep(delay).await;
        }
        *self.batches_done.lock() += 1;
        if self.fail_events {
            return Err(ProcessorError::new("poison message"));
        }
        Ok(())
    }

    async fn on_close(&self, _ctx: &PartitionContext, reason: CloseReason) {
        self.closes.lock().push(reason);
    }

    async fn on_error(&self, _ctx: &PartitionContext, error: &PumpError) {
        self.errors.lock().push(error.as_label());
    }
}

pub struct Fixture {
    pub transport: Arc<MockTransport>,
    pub lease: Arc<Lease>,
    pub processor: Arc<Recording>,
    pub pump: PartitionPump,
}

impl Fixture {
    pub fn new(options: PumpOptions) -> Self {
        Self::with_processor(options, Recording::new())
    }

    pub fn with_processor(options: PumpOptions, processor: Arc<Recording>) -> Self {
        let transport = Arc::new(MockTransport::new());
        let lease = Arc::new(Lease::new(PARTITION, HOST, 3));
        let ctx = Arc::new(PartitionContext::new(
            HOST,
            GROUP,
            PARTITION,
            Some(Cursor::token("T1")),
        ));
        let pump = PartitionPump::builder(
            transport.clone(),
            lease.clone(),
            ctx,
            processor.clone(),
        )
        .options(options)
        .build()
        .expect("valid options");
        Self {
            transport,
            lease,
            processor,
            pump,
        }
    }
}

pub fn event(seq: i64) -> EventData {
    EventData::new(format!("body-{seq}"), seq, (seq * 100).to_string())
}

/// Polls `cond` until it holds, failing the test after a few seconds.
pub async fn eventually(what: &str, cond: impl Fn() -> bool) {
    let polled = tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for: {what}");
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
