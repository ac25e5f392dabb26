// src/exec/cancel.rs

use std::sync::Arc;

use tokio::sync::watch;

/// One-shot cancellation signal shared by everything in a single invocation.
///
/// Cloning is cheap and every clone observes the same signal: the running
/// process (which gets killed), the directory scan (which stops early) and
/// the iteration loop (which does not start the next item). Once cancelled
/// it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`CancelSignal::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // The sender lives in `self`, so this cannot happen while we
            // are borrowed; never resolve rather than report a false cancel.
            std::future::pending::<()>().await;
        }
    }
}
