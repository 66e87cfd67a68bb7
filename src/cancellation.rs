//! Cooperative cancellation for in-flight fetches
//!
//! Each issued fetch gets a token stamped with a monotonically increasing
//! generation. Superseding a fetch cancels its token; repositories can await
//! [`CancellationToken::cancelled`] to abort early, and the coordinator compares
//! generations before applying any result.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancellationToken {
    generation: u64,
    state: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    #[must_use]
    pub fn new(generation: u64) -> Self {
        let (state, _) = watch::channel(false);
        Self {
            generation,
            state: Arc::new(state),
        }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Idempotent; wakes every task awaiting [`Self::cancelled`]
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once the token is cancelled. Never resolves otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
