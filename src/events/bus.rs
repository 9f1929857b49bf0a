//! # Event bus for broadcasting pump events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. Publishing never blocks, which matters
//! here: pumps publish from the transport's delivery path and from `on_error`, both
//! of which have to return promptly.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` calls `broadcast::Sender::send` and ignores "no receivers".
//! - **Bounded capacity**: slow receivers observe `RecvError::Lagged(n)` and skip `n` items.
//! - **No persistence**: events sent with no receivers are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone; every pump created from the same bus publishes into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of receivers currently attached.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn publish_without_receivers_is_silent() {
        let bus = Bus::new(4);
        bus.publish(Event::new(EventKind::PumpOpening));
        assert_eq!(bus.receiver_count(), 0);
    }

    #[tokio::test]
    async fn receivers_see_later_events() {
        let bus = Bus::new(4);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::PumpClosed).with_partition("1"));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::PumpClosed);
        assert_eq!(ev.partition.as_deref(), Some("1"));
    }
}
