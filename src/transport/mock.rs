//! # Scripted in-memory transport.
//!
//! [`MockTransport`] implements the transport traits without any network. Each call to
//! `create_client` / `create_epoch_receiver` consumes the next scripted [`Step`]
//! (an empty script means success), and every client, receiver and receiver request is
//! recorded for inspection. [`MockReceiver::deliver`] and [`MockReceiver::fail`] drive the
//! installed handler the way a real delivery task would: sequentially, and with
//! `clear_receive_handler` waiting for the in-flight callback to return.
//!
//! Useful for testing application processors against a real [`PartitionPump`](crate::PartitionPump).

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{RwLock, watch};

use crate::error::TransportError;
use crate::model::{Cursor, EventData, ReceiverRuntimeInfo};
use crate::transport::{
    PartitionReceiver, ReceiveHandler, ReceiverOptions, Transport, TransportClient,
};

/// Scripted outcome of one creation call.
#[derive(Clone, Debug)]
pub enum Step {
    /// Succeed.
    Ok,
    /// Fail with the given error.
    Fail(TransportError),
    /// Never complete (until the caller gives up).
    Hang,
    /// Succeed after a delay.
    Delay(Duration),
}

impl Step {
    async fn play(self) -> Result<(), TransportError> {
        match self {
            Step::Ok => Ok(()),
            Step::Fail(e) => Err(e),
            Step::Hang => futures::future::pending().await,
            Step::Delay(d) => {
                tokio::time::sleep(d).await;
                Ok(())
            }
        }
    }
}

/// Arguments of one `create_epoch_receiver` call.
#[derive(Clone, Debug)]
pub struct ReceiverRequest {
    pub consumer_group: String,
    pub partition_id: String,
    pub cursor: Cursor,
    pub epoch: u64,
    pub options: ReceiverOptions,
}

#[derive(Default)]
struct Shared {
    client_script: Mutex<VecDeque<Step>>,
    receiver_script: Mutex<VecDeque<Step>>,
    client_attempts: AtomicUsize,
    clients: Mutex<Vec<Arc<MockClient>>>,
    receivers: Mutex<Vec<Arc<MockReceiver>>>,
    requests: Mutex<Vec<ReceiverRequest>>,
}

impl Shared {
    fn next(script: &Mutex<VecDeque<Step>>) -> Step {
        script.lock().pop_front().unwrap_or(Step::Ok)
    }
}

/// In-memory [`Transport`].
#[derive(Default)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends outcomes for upcoming `create_client` calls.
    pub fn script_clients(&self, steps: impl IntoIterator<Item = Step>) {
        self.shared.client_script.lock().extend(steps);
    }

    /// Appends outcomes for upcoming `create_epoch_receiver` calls (across all clients).
    pub fn script_receivers(&self, steps: impl IntoIterator<Item = Step>) {
        self.shared.receiver_script.lock().extend(steps);
    }

    /// Number of `create_client` calls made so far.
    pub fn client_attempts(&self) -> usize {
        self.shared.client_attempts.load(Ordering::SeqCst)
    }

    /// Clients created successfully, in order.
    pub fn clients(&self) -> Vec<Arc<MockClient>> {
        self.shared.clients.lock().clone()
    }

    /// Receivers created successfully, in order.
    pub fn receivers(&self) -> Vec<Arc<MockReceiver>> {
        self.shared.receivers.lock().clone()
    }

    /// The latest receiver, if any.
    pub fn last_receiver(&self) -> Option<Arc<MockReceiver>> {
        self.shared.receivers.lock().last().cloned()
    }

    /// Every `create_epoch_receiver` call, including failed ones.
    pub fn receiver_requests(&self) -> Vec<ReceiverRequest> {
        self.shared.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn kind(&self) -> &'static str {
        "mock"
    }

    async fn create_client(&self) -> Result<Arc<dyn TransportClient>, TransportError> {
        self.shared.client_attempts.fetch_add(1, Ordering::SeqCst);
        Shared::next(&self.shared.client_script).play().await?;
        let client = Arc::new(MockClient {
            shared: Arc::clone(&self.shared),
            close_calls: AtomicUsize::new(0),
            close_error: Mutex::new(None),
        });
        self.shared.clients.lock().push(Arc::clone(&client));
        Ok(client)
    }
}

/// In-memory [`TransportClient`].
pub struct MockClient {
    shared: Arc<Shared>,
    close_calls: AtomicUsize,
    close_error: Mutex<Option<TransportError>>,
}

impl MockClient {
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Makes every later `close` fail with `err`.
    pub fn fail_close(&self, err: TransportError) {
        *self.close_error.lock() = Some(err);
    }
}

#[async_trait]
impl TransportClient for MockClient {
    async fn create_epoch_receiver(
        &self,
        consumer_group: &str,
        partition_id: &str,
        cursor: &Cursor,
        epoch: u64,
        options: &ReceiverOptions,
    ) -> Result<Arc<dyn PartitionReceiver>, TransportError> {
        self.shared.requests.lock().push(ReceiverRequest {
            consumer_group: consumer_group.to_string(),
            partition_id: partition_id.to_string(),
            cursor: cursor.clone(),
            epoch,
            options: options.clone(),
        });
        Shared::next(&self.shared.receiver_script).play().await?;
        let receiver = Arc::new(MockReceiver::new(epoch));
        self.shared.receivers.lock().push(Arc::clone(&receiver));
        Ok(receiver)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        match self.close_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct HandlerSlot {
    handler: Arc<dyn ReceiveHandler>,
    invoke_on_empty: bool,
}

/// In-memory [`PartitionReceiver`].
pub struct MockReceiver {
    epoch: u64,
    handler: Mutex<Option<HandlerSlot>>,
    // Deliveries hold a read guard; clearing the handler takes the write guard.
    delivery: RwLock<()>,
    clear_gate: watch::Sender<bool>,
    prefetch: Mutex<Option<u32>>,
    receive_timeout: Mutex<Option<Duration>>,
    runtime_info: Mutex<Option<ReceiverRuntimeInfo>>,
    close_error: Mutex<Option<TransportError>>,
    clear_calls: AtomicUsize,
    clears_done: AtomicUsize,
    close_calls: AtomicUsize,
}

impl MockReceiver {
    fn new(epoch: u64) -> Self {
        let (clear_gate, _) = watch::channel(true);
        Self {
            epoch,
            handler: Mutex::new(None),
            delivery: RwLock::new(()),
            clear_gate,
            prefetch: Mutex::new(None),
            receive_timeout: Mutex::new(None),
            runtime_info: Mutex::new(None),
            close_error: Mutex::new(None),
            clear_calls: AtomicUsize::new(0),
            clears_done: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Epoch the receiver was opened with.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Delivers one batch to the installed handler and waits for it to return.
    ///
    /// Returns `false` if no handler is installed.
    pub async fn deliver(&self, events: Option<Vec<EventData>>) -> bool {
        let _in_flight = self.delivery.read().await;
        let handler = self.handler.lock().as_ref().map(|s| Arc::clone(&s.handler));
        match handler {
            Some(h) => {
                h.on_receive(events).await;
                true
            }
            None => false,
        }
    }

    /// Reports an error to the installed handler from the delivery path.
    ///
    /// Returns `false` if no handler is installed.
    pub async fn fail(&self, error: TransportError) -> bool {
        let _in_flight = self.delivery.read().await;
        let handler = self.handler.lock().as_ref().map(|s| Arc::clone(&s.handler));
        match handler {
            Some(h) => {
                h.on_error(error);
                true
            }
            None => false,
        }
    }

    /// Makes `clear_receive_handler` block until [`release_clear`](Self::release_clear).
    pub fn hold_clear(&self) {
        self.clear_gate.send_replace(false);
    }

    pub fn release_clear(&self) {
        self.clear_gate.send_replace(true);
    }

    /// Makes every later `close` fail with `err`.
    pub fn fail_close(&self, err: TransportError) {
        *self.close_error.lock() = Some(err);
    }

    /// Sets the runtime info the receiver reports.
    pub fn set_runtime_info(&self, info: ReceiverRuntimeInfo) {
        *self.runtime_info.lock() = Some(info);
    }

    pub fn handler_installed(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// `invoke_on_empty` flag of the installed handler.
    pub fn invoke_on_empty(&self) -> Option<bool> {
        self.handler.lock().as_ref().map(|s| s.invoke_on_empty)
    }

    /// `max_batch_size` advertised by the installed handler.
    pub fn handler_batch_size(&self) -> Option<usize> {
        self.handler.lock().as_ref().map(|s| s.handler.max_batch_size())
    }

    pub fn prefetch_count(&self) -> Option<u32> {
        *self.prefetch.lock()
    }

    pub fn receive_timeout(&self) -> Option<Duration> {
        *self.receive_timeout.lock()
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }

    /// Number of `clear_receive_handler` calls that have fully drained.
    pub fn clears_done(&self) -> usize {
        self.clears_done.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PartitionReceiver for MockReceiver {
    fn set_prefetch_count(&self, count: u32) {
        *self.prefetch.lock() = Some(count);
    }

    fn set_receive_timeout(&self, timeout: Duration) {
        *self.receive_timeout.lock() = Some(timeout);
    }

    fn runtime_info(&self) -> Option<ReceiverRuntimeInfo> {
        self.runtime_info.lock().clone()
    }

    fn set_receive_handler(&self, handler: Arc<dyn ReceiveHandler>, invoke_on_empty: bool) {
        *self.handler.lock() = Some(HandlerSlot {
            handler,
            invoke_on_empty,
        });
    }

    async fn clear_receive_handler(&self) -> Result<(), TransportError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.handler.lock().take();

        let mut gate = self.clear_gate.subscribe();
        // Sender lives in self, so the channel cannot close here.
        let _ = gate.wait_for(|open| *open).await;

        let _drained = self.delivery.write().await;
        self.clears_done.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        match self.close_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
