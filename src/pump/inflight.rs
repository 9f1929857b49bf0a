//! # In-flight open operation slot.
//!
//! Holds the cancellation handle of the open attempt currently running, so shutdown can
//! unblock an attempt stuck in client or receiver creation. The opener registers a fresh
//! child token per attempt and clears it when the attempt settles; shutdown cancels
//! whatever is registered. Cancelling an empty slot does nothing.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub(crate) struct InFlight {
    slot: Mutex<Option<CancellationToken>>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a new attempt derived from `parent` and returns its token.
    ///
    /// If `parent` is already cancelled the returned token is cancelled too.
    pub(crate) fn begin(&self, parent: &CancellationToken) -> CancellationToken {
        let token = parent.child_token();
        *self.slot.lock() = Some(token.clone());
        token
    }

    /// Clears the slot once the attempt has settled.
    pub(crate) fn finish(&self) {
        self.slot.lock().take();
    }

    /// Cancels the registered attempt, if any. Returns whether one was registered.
    pub(crate) fn cancel(&self) -> bool {
        match self.slot.lock().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }
}
