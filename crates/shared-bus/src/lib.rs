//! # Shared Bus - In-Process Event Bus for Host Modules
//!
//! Decouples producers of domain events from their consumers. Publishers never
//! wait for handlers to run; any caller can still ask to be woken once every
//! event published so far has been handled.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Module A   │                    │   Module B   │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │  (1 worker)  │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Guarantees
//!
//! - **FIFO dispatch:** events start dispatch in publish order; handlers for
//!   one event run in subscription order before the next event starts.
//! - **Backpressure, not loss:** the queue is bounded and `publish` waits for
//!   space instead of dropping.
//! - **Barrier:** `wait()` resolves only after every published event finished
//!   dispatch, whether or not it had handlers.
//! - **Isolation:** a handler error or panic is logged and counted; it never
//!   reaches the publisher and never stalls `wait()`.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod completion;
pub mod events;
pub mod handler;
pub mod publisher;

// Re-export main types
pub use completion::CompletionBarrier;
pub use events::{Event, Payload};
pub use handler::{handler_fn, EventHandler, FnHandler, HandlerError, HandlerResult};
pub use publisher::{BusError, BusStats, EventBus, EventPublisher};

/// Events buffered on the delivery queue before publishers wait.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_QUEUE_CAPACITY, 100);
    }

    #[tokio::test]
    async fn test_default_bus() {
        let bus = EventBus::default();
        assert_eq!(bus.capacity(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(bus.stats(), BusStats::default());
        assert!(!bus.is_closed());
    }
}
