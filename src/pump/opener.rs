//! # Connection opener: epoch-fenced client + receiver creation with bounded retry.
//!
//! ## Flow
//! ```text
//! validate cursor ──invalid──► Err(InvalidCursor)            (no attempt consumed)
//!        │
//! loop {
//!   ├─► attempt += 1, register child token in InFlight
//!   ├─► epoch = lease.epoch()                                 (re-read every attempt)
//!   ├─► create_client()                 ─┐
//!   ├─► create_epoch_receiver(epoch)     ├─ each step races cancellation + attempt deadline
//!   │     └─ lease.stamp_epoch(epoch)   ─┘
//!   ├─► apply prefetch / receive timeout
//!   │
//!   ├─ Ok                  ─► return handle
//!   ├─ cancelled           ─► close partial client, Err(Cancelled)
//!   ├─ EpochFenced         ─► close partial client, Err(Fenced)          (no retry)
//!   └─ other error         ─► close partial client
//!                             ├─ attempts left ─► sleep(retry.delay), continue
//!                             └─ exhausted     ─► Err(RetriesExhausted{last})
//! }
//! ```
//!
//! ## Rules
//! - At most one client is alive per pump: a client from a failed attempt is closed
//!   before the next attempt starts.
//! - The fencing decision comes from [`TransportError::is_fencing_conflict`], never from text.

use std::future::Future;
use std::sync::Arc;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PumpOptions;
use crate::error::{OpenError, TransportError, TransportErrorKind};
use crate::events::{Bus, Event, EventKind};
use crate::model::{Cursor, Lease, PartitionContext};
use crate::pump::inflight::InFlight;
use crate::transport::{PartitionReceiver, ReceiverOptions, Transport, TransportClient};

/// Client and receiver of one open connection. Owned by exactly one pump.
pub struct ConnectionHandle {
    pub(crate) client: Arc<dyn TransportClient>,
    pub(crate) receiver: Arc<dyn PartitionReceiver>,
}

/// Successful open.
pub(crate) struct Opened {
    pub(crate) handle: ConnectionHandle,
    pub(crate) attempts: u32,
    pub(crate) epoch: u64,
}

/// Per-attempt outcome before classification.
enum AttemptError {
    Cancelled,
    Failed(TransportError),
}

/// Everything one open sequence reads.
pub(crate) struct OpenRequest<'a> {
    pub(crate) lease: &'a Lease,
    pub(crate) context: &'a PartitionContext,
    pub(crate) options: &'a PumpOptions,
    pub(crate) in_flight: &'a InFlight,
    pub(crate) shutdown: &'a CancellationToken,
    pub(crate) bus: &'a Bus,
}

/// Opens epoch receivers through a [`Transport`].
pub(crate) struct ConnectionOpener<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> ConnectionOpener<T> {
    pub(crate) fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Runs the open sequence until success, a fatal error, exhaustion, or cancellation.
    pub(crate) async fn open(&self, req: OpenRequest<'_>) -> Result<Opened, OpenError> {
        let ctx = req.context;
        let cursor = validate_cursor(ctx.initial_cursor()).inspect_err(|e| {
            warn!(
                host = ctx.host_name(),
                partition = ctx.partition_id(),
                error = %e,
                "refusing to open receiver"
            );
        })?;

        let retry = req.options.open_retry;
        let mut attempt: u32 = 0;

        loop {
            if req.shutdown.is_cancelled() {
                return Err(OpenError::Cancelled);
            }
            attempt += 1;
            let epoch = req.lease.epoch();
            let token = req.in_flight.begin(req.shutdown);
            let res = self.attempt(&req, cursor, epoch, &token).await;
            req.in_flight.finish();

            let err = match res {
                Ok(handle) => {
                    info!(
                        host = ctx.host_name(),
                        partition = ctx.partition_id(),
                        epoch,
                        attempt,
                        "client and receiver creation finished"
                    );
                    return Ok(Opened {
                        handle,
                        attempts: attempt,
                        epoch,
                    });
                }
                Err(AttemptError::Cancelled) => {
                    info!(
                        host = ctx.host_name(),
                        partition = ctx.partition_id(),
                        attempt,
                        "open cancelled"
                    );
                    return Err(OpenError::Cancelled);
                }
                Err(AttemptError::Failed(e)) => e,
            };

            if err.is_fencing_conflict() {
                warn!(
                    host = ctx.host_name(),
                    partition = ctx.partition_id(),
                    epoch,
                    attempt,
                    error = %err,
                    "receiver rejected on create, a higher epoch holds the partition"
                );
                return Err(OpenError::Fenced { epoch, source: err });
            }

            warn!(
                host = ctx.host_name(),
                partition = ctx.partition_id(),
                epoch,
                attempt,
                error = %err,
                "failure creating client or receiver"
            );
            req.bus.publish(
                Event::new(EventKind::OpenAttemptFailed)
                    .with_partition(ctx.partition_id())
                    .with_attempt(attempt)
                    .with_epoch(epoch)
                    .with_reason(err.to_string()),
            );

            if !retry.allows(attempt) {
                return Err(OpenError::RetriesExhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = retry.delay(attempt);
            if !delay.is_zero() {
                debug!(
                    host = ctx.host_name(),
                    partition = ctx.partition_id(),
                    ?delay,
                    "waiting before next open attempt"
                );
                tokio::select! {
                    _ = time::sleep(delay) => {}
                    _ = req.shutdown.cancelled() => return Err(OpenError::Cancelled),
                }
            }
        }
    }

    /// One attempt: client, then receiver. A client left over from a failed step is closed.
    async fn attempt(
        &self,
        req: &OpenRequest<'_>,
        cursor: &Cursor,
        epoch: u64,
        token: &CancellationToken,
    ) -> Result<ConnectionHandle, AttemptError> {
        let ctx = req.context;
        let deadline = req.options.attempt_timeout().map(|d| Instant::now() + d);

        info!(
            host = ctx.host_name(),
            partition = ctx.partition_id(),
            transport = self.transport.kind(),
            "opening client"
        );
        let client = guarded(self.transport.create_client(), token, deadline).await?;

        info!(
            host = ctx.host_name(),
            partition = ctx.partition_id(),
            epoch,
            cursor = %cursor,
            "opening epoch receiver"
        );
        let receiver_options = ReceiverOptions {
            runtime_metrics_enabled: req.options.metrics_enabled,
            identifier: Some(format!("{}-{}", ctx.host_name(), ctx.partition_id())),
        };
        let create = client.create_epoch_receiver(
            ctx.consumer_group(),
            ctx.partition_id(),
            cursor,
            epoch,
            &receiver_options,
        );
        let created = guarded(create, token, deadline).await;
        if !matches!(created, Err(AttemptError::Cancelled)) {
            req.lease.stamp_epoch(epoch);
        }

        match created {
            Ok(receiver) => {
                receiver.set_prefetch_count(req.options.prefetch_count);
                receiver.set_receive_timeout(req.options.receive_timeout);
                Ok(ConnectionHandle { client, receiver })
            }
            Err(e) => {
                close_partial_client(ctx, client.as_ref()).await;
                Err(e)
            }
        }
    }
}

fn validate_cursor(cursor: Option<&Cursor>) -> Result<&Cursor, OpenError> {
    match cursor {
        None => Err(OpenError::InvalidCursor {
            reason: "no starting cursor".into(),
        }),
        Some(Cursor::Token(t)) if t.is_empty() => Err(OpenError::InvalidCursor {
            reason: "empty position token".into(),
        }),
        Some(c) => Ok(c),
    }
}

/// Races `fut` against cancellation and the attempt deadline.
async fn guarded<F, R>(
    fut: F,
    token: &CancellationToken,
    deadline: Option<Instant>,
) -> Result<R, AttemptError>
where
    F: Future<Output = Result<R, TransportError>>,
{
    let timed = async {
        match deadline {
            Some(at) => match time::timeout_at(at, fut).await {
                Ok(r) => r,
                Err(_elapsed) => Err(TransportError::new(
                    TransportErrorKind::Timeout,
                    "open attempt timed out",
                )),
            },
            None => fut.await,
        }
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AttemptError::Cancelled),
        r = timed => r.map_err(AttemptError::Failed),
    }
}

async fn close_partial_client(ctx: &PartitionContext, client: &dyn TransportClient) {
    if let Err(e) = client.close().await {
        info!(
            host = ctx.host_name(),
            partition = ctx.partition_id(),
            error = %e,
            "closing partially opened client failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::transport::mock::{MockTransport, Step};

    struct Fixture {
        lease: Lease,
        ctx: PartitionContext,
        options: PumpOptions,
        in_flight: InFlight,
        shutdown: CancellationToken,
        bus: Bus,
    }

    impl Fixture {
        fn new(cursor: Option<Cursor>) -> Self {
            Self {
                lease: Lease::new("0", "host-a", 3),
                ctx: PartitionContext::new("host-a", "$Default", "0", cursor),
                options: PumpOptions::default(),
                in_flight: InFlight::new(),
                shutdown: CancellationToken::new(),
                bus: Bus::new(16),
            }
        }

        fn req(&self) -> OpenRequest<'_> {
            OpenRequest {
                lease: &self.lease,
                context: &self.ctx,
                options: &self.options,
                in_flight: &self.in_flight,
                shutdown: &self.shutdown,
                bus: &self.bus,
            }
        }
    }

    #[tokio::test]
    async fn missing_cursor_is_fatal_without_an_attempt() {
        let transport = Arc::new(MockTransport::new());
        let opener = ConnectionOpener::new(transport.clone());
        let fx = Fixture::new(None);

        let err = opener.open(fx.req()).await.err().unwrap();
        assert!(matches!(err, OpenError::InvalidCursor { .. }));
        assert!(err.is_fatal());
        assert_eq!(transport.client_attempts(), 0);
    }

    #[tokio::test]
    async fn empty_token_is_fatal_without_an_attempt() {
        let transport = Arc::new(MockTransport::new());
        let opener = ConnectionOpener::new(transport.clone());
        let fx = Fixture::new(Some(Cursor::token("")));

        let err = opener.open(fx.req()).await.err().unwrap();
        assert!(matches!(err, OpenError::InvalidCursor { .. }));
        assert_eq!(transport.client_attempts(), 0);
    }

    #[tokio::test]
    async fn timestamp_cursor_is_accepted() {
        let transport = Arc::new(MockTransport::new());
        let opener = ConnectionOpener::new(transport.clone());
        let fx = Fixture::new(Some(Cursor::Timestamp(std::time::SystemTime::UNIX_EPOCH)));

        let opened = opener.open(fx.req()).await.ok().unwrap();
        assert_eq!(opened.attempts, 1);
        assert_eq!(
            transport.receiver_requests()[0].cursor,
            Cursor::Timestamp(std::time::SystemTime::UNIX_EPOCH)
        );
    }

    #[tokio::test]
    async fn receiver_failure_closes_the_partial_client() {
        let transport = Arc::new(MockTransport::new());
        transport.script_receivers([Step::Fail(TransportError::connection("link detached"))]);
        let opener = ConnectionOpener::new(transport.clone());
        let fx = Fixture::new(Some(Cursor::token("T1")));

        let opened = opener.open(fx.req()).await.ok().unwrap();
        assert_eq!(opened.attempts, 2);
        let clients = transport.clients();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].close_calls(), 1);
        assert_eq!(clients[1].close_calls(), 0);
        assert!(!fx.in_flight.is_set());
    }

    #[tokio::test]
    async fn epoch_is_reread_on_every_attempt() {
        let transport = Arc::new(MockTransport::new());
        transport.script_receivers([Step::Fail(TransportError::connection("busy"))]);
        let fx = Fixture::new(Some(Cursor::token("T1")));
        let lease_bump = {
            // The store renews the lease after the first failure is observed.
            let mut rx = fx.bus.subscribe();
            let lease = &fx.lease;
            async move {
                let _ = rx.recv().await;
                lease.bump_epoch();
            }
        };
        let opener = ConnectionOpener::new(transport.clone());
        let delayed = PumpOptions {
            open_retry: crate::OpenRetryPolicy {
                first: Duration::from_millis(20),
                ..Default::default()
            },
            ..PumpOptions::default()
        };
        let req = OpenRequest {
            options: &delayed,
            ..fx.req()
        };

        let (opened, ()) = tokio::join!(opener.open(req), lease_bump);
        let opened = opened.ok().unwrap();
        assert_eq!(opened.epoch, 4);
        let epochs: Vec<u64> = transport.receiver_requests().iter().map(|r| r.epoch).collect();
        assert_eq!(epochs, vec![3, 4]);
        assert_eq!(fx.lease.epoch(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn lease_keeps_the_wire_epoch_when_renewed_mid_attempt() {
        let transport = Arc::new(MockTransport::new());
        transport.script_receivers([Step::Delay(Duration::from_secs(1))]);
        let opener = ConnectionOpener::new(transport.clone());
        let fx = Fixture::new(Some(Cursor::token("T1")));
        let renew = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            fx.lease.bump_epoch();
        };

        let (opened, ()) = tokio::join!(opener.open(fx.req()), renew);
        let opened = opened.ok().unwrap();
        assert_eq!(opened.epoch, 3);
        assert_eq!(transport.receiver_requests()[0].epoch, 3);
        assert_eq!(fx.lease.epoch(), opened.epoch);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_timeout_is_transient() {
        let transport = Arc::new(MockTransport::new());
        transport.script_clients([Step::Hang]);
        let opener = ConnectionOpener::new(transport.clone());
        let mut fx = Fixture::new(Some(Cursor::token("T1")));
        fx.options.open_attempt_timeout = Duration::from_secs(1);

        let opened = opener.open(fx.req()).await.ok().unwrap();
        assert_eq!(opened.attempts, 2);
    }
}
