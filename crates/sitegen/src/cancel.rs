use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

// ─── CancelToken ──────────────────────────────────────────────────────────

/// Clonable cancellation handle threaded into every generation turn.
///
/// One token is created per top-level chat request. The session stream
/// registry cancels the displaced token when a newer message claims the
/// same application, so an abandoned turn stops producing events instead
/// of racing the new one on the sandbox.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; wakes all waiters.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        // Register before checking so a cancel between the check and the
        // await cannot be missed.
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
