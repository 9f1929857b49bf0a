//! # Execution context for deferred work.
//!
//! [`Executor`] accepts a zero-argument deferred task and runs it independently of the
//! caller. The delivery bridge uses it to move error-triggered teardown off the transport's
//! delivery task, where awaiting `clear_receive_handler` would wait on itself.
//!
//! A [`Deferred`] is a boxed `FnOnce` future factory: submitting consumes it, so each
//! submitted task runs at most once, and [`TokioExecutor`] guarantees it is spawned.

use futures::future::BoxFuture;
use tokio::runtime::Handle;

/// A unit of deferred work. Consumed when run.
pub type Deferred = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send + 'static>;

/// Runs deferred tasks outside the submitting call stack.
pub trait Executor: Send + Sync + 'static {
    fn submit(&self, task: Deferred);
}

/// Spawns deferred tasks onto a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Uses the given runtime handle.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime this is called from.
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn submit(&self, task: Deferred) {
        self.handle.spawn(task());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn submitted_task_runs_off_the_caller_stack() {
        let exec = TokioExecutor::current().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();

        let r = runs.clone();
        exec.submit(Box::new(move || {
            async move {
                r.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            }
            .boxed()
        }));
        // current_thread runtime: nothing ran yet
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        rx.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
