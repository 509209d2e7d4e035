//! # Event Handlers
//!
//! Defines the consuming side of the event bus. A handler is anything that can
//! receive one event and act on it: a stateful object implementing
//! [`EventHandler`], or a plain async closure wrapped by [`handler_fn`].

use crate::events::Event;
use async_trait::async_trait;
use std::future::Future;

/// Error returned by a failing handler. Logged by the bus, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result of handling one event.
pub type HandlerResult = Result<(), HandlerError>;

/// Capability: receive one event and act on it.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle a single dispatched event.
    async fn handle(&self, event: &Event) -> HandlerResult;
}

/// Adapter turning an async closure into an [`EventHandler`].
pub struct FnHandler<F> {
    func: F,
}

/// Wrap `func` so it satisfies [`EventHandler`].
pub fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    FnHandler { func }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn handle(&self, event: &Event) -> HandlerResult {
        (self.func)(event.clone()).await
    }
}
