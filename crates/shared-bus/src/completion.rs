//! # Completion Barrier
//!
//! Counted barrier backing [`EventBus::wait`](crate::EventBus::wait): one
//! increment per accepted publish, one decrement per event whose dispatch has
//! finished. Waiters resolve when the count reaches zero.

use std::sync::Arc;
use tokio::sync::watch;

/// Counter of events that were published but not yet fully dispatched.
#[derive(Debug)]
pub struct CompletionBarrier {
    pending: watch::Sender<usize>,
}

impl CompletionBarrier {
    /// Create a barrier with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        let (pending, _) = watch::channel(0);
        Self { pending }
    }

    /// Record one more in-flight event.
    pub fn add(&self) {
        self.pending.send_modify(|count| *count += 1);
    }

    /// Record that one in-flight event has finished.
    pub fn done(&self) {
        self.pending
            .send_modify(|count| *count = count.saturating_sub(1));
    }

    /// Number of events currently in flight.
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Resolve once nothing is in flight.
    pub async fn wait(&self) {
        let mut receiver = self.pending.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = receiver.wait_for(|count| *count == 0).await;
    }
}

impl Default for CompletionBarrier {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the barrier when dropped, unless handed off.
///
/// Publishers create one before enqueueing so a failed or cancelled send rolls
/// the increment back; the delivery worker adopts one per dequeued event so
/// the decrement happens on every exit path, panics included.
pub(crate) struct PendingGuard {
    barrier: Option<Arc<CompletionBarrier>>,
}

impl PendingGuard {
    /// Increment the barrier and guard the increment.
    pub(crate) fn acquire(barrier: Arc<CompletionBarrier>) -> Self {
        barrier.add();
        Self {
            barrier: Some(barrier),
        }
    }

    /// Guard an increment made elsewhere.
    pub(crate) fn adopt(barrier: Arc<CompletionBarrier>) -> Self {
        Self {
            barrier: Some(barrier),
        }
    }

    /// Transfer responsibility for the decrement to whoever dequeues the event.
    pub(crate) fn hand_off(mut self) {
        self.barrier = None;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Some(barrier) = self.barrier.take() {
            barrier.done();
        }
    }
}
