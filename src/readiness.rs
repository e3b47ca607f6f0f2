//! Startup readiness signal.
//!
//! The process starts in `Initializing` and moves to `Ready` exactly once,
//! after the startup sequence has verified the chat session. Entry points
//! consult the current phase; nothing is processed before the flip.

use std::sync::Arc;
use tokio::sync::watch;

/// Startup phase of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Ready,
}

/// One-shot readiness signal, cheap to clone and share across handlers.
#[derive(Clone)]
pub struct Readiness {
    tx: Arc<watch::Sender<Phase>>,
}

impl Readiness {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Phase::Initializing);
        Self { tx: Arc::new(tx) }
    }

    /// Fires the signal. Later calls are no-ops.
    pub fn mark_ready(&self) {
        self.tx.send_replace(Phase::Ready);
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.tx.borrow(), Phase::Ready)
    }

    pub fn phase(&self) -> Phase {
        *self.tx.borrow()
    }

    /// Resolves once the signal has fired; resolves immediately if it already
    /// has. Any number of tasks may wait.
    pub async fn ready(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives at least as long as this borrow, so wait_for
        // cannot observe a closed channel.
        let _ = rx.wait_for(|phase| matches!(phase, Phase::Ready)).await;
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}
