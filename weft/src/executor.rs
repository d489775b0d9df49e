//! The task executor boundary.
//!
//! Every action boundary in a pipeline run is dispatched through a
//! [`TaskExecutor`] rather than run on the caller's thread. This is what
//! bounds stack depth for arbitrarily long chains and keeps a long
//! synchronous handler from monopolizing the thread that started the run.

use futures::future::BoxFuture;

/// A pluggable task pool accepting fire-and-forget futures.
///
/// Implementations must support safe concurrent submission from multiple
/// in-flight pipeline runs.
pub trait TaskExecutor: Send + Sync {
    /// Dispatches a task onto the pool.
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Executor dispatching onto the ambient tokio runtime.
///
/// This is the default; tokio's worker pool provides the bounded-pool
/// behavior. Panics if used outside a runtime context, like `tokio::spawn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioExecutor;

impl TokioExecutor {
    /// Creates the executor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TaskExecutor for TokioExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        drop(tokio::spawn(task));
    }
}

/// Executor pinned to a specific tokio runtime handle.
///
/// Useful when pipeline runs should land on a dedicated runtime rather than
/// whichever one the caller happens to be on.
#[derive(Debug, Clone)]
pub struct HandleExecutor {
    handle: tokio::runtime::Handle,
}

impl HandleExecutor {
    /// Pins the executor to the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl TaskExecutor for HandleExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        drop(self.handle.spawn(task));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn tokio_executor_runs_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let executor = TokioExecutor::new();

        let (tx, rx) = tokio::sync::oneshot::channel();
        let task_counter = counter.clone();
        executor.spawn(Box::pin(async move {
            task_counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(());
        }));

        rx.await.ok();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handle_executor_runs_on_its_runtime() {
        let executor = HandleExecutor::new(tokio::runtime::Handle::current());

        let (tx, rx) = tokio::sync::oneshot::channel();
        executor.spawn(Box::pin(async move {
            let _ = tx.send(7);
        }));

        assert_eq!(rx.await.ok(), Some(7));
    }
}
