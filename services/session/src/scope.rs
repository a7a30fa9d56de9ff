//! Background tasks bound to the lifetime of an owning value

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A spawned loop that stops when its handle goes away
///
/// The task receives a [`CancellationToken`] and is expected to return once
/// it fires. Dropping the handle cancels the token and aborts the task, so
/// a loop that is stuck in an await still stops.
#[derive(Debug)]
pub struct ScopedTask {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ScopedTask {
    /// Spawn `task` on the current runtime
    pub fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(task(cancel.child_token()));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the task and wait for it to wind down
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
