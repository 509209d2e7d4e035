//! # Event Publisher
//!
//! Defines the publishing side of the event bus and the in-process
//! [`EventBus`] implementation.
//!
//! ## Delivery
//!
//! ```text
//!  publish() ──► [ bounded FIFO queue ] ──► worker ──► handler 1 ──► handler 2 ...
//!     │                                        │
//!     └── completion += 1                      └── completion -= 1 (always)
//! ```
//!
//! A single background worker drains the queue. Handlers for one event run
//! sequentially, in subscription order, before the next event is dequeued.

use crate::completion::{CompletionBarrier, PendingGuard};
use crate::events::Event;
use crate::handler::{handler_fn, EventHandler, HandlerResult};
use crate::DEFAULT_QUEUE_CAPACITY;
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

/// Errors from publishing.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The bus was closed and accepts no further events.
    #[error("Event bus closed")]
    Closed,

    /// The delivery queue is at capacity (non-blocking publish only).
    #[error("Event bus queue full")]
    Full,
}

/// Trait for publishing events to the bus.
///
/// This is the seam feature code depends on, so it can be handed the shared
/// bus in production and a recording double in tests.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Enqueue an event for asynchronous delivery.
    ///
    /// Waits while the delivery queue is full; never drops the event.
    async fn publish(&self, event: Event) -> Result<(), BusError>;

    /// Total number of events accepted so far.
    fn events_published(&self) -> u64;
}

type HandlerMap = HashMap<String, Vec<Arc<dyn EventHandler>>>;

#[derive(Debug, Default)]
struct BusCounters {
    published: AtomicU64,
    dispatched: AtomicU64,
    handler_failures: AtomicU64,
}

/// Point-in-time view of bus activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusStats {
    /// Events accepted onto the queue.
    pub published: u64,
    /// Events whose dispatch finished (with or without handlers).
    pub dispatched: u64,
    /// Handler invocations that returned an error or panicked.
    pub handler_failures: u64,
    /// Events published but not yet fully dispatched.
    pub in_flight: usize,
}

/// In-process event bus with a bounded queue and a single delivery worker.
pub struct EventBus {
    /// Queue writer; `None` once closed.
    sender: Mutex<Option<mpsc::Sender<Event>>>,

    /// Subscriptions by event type. Readers: the worker. Writers: `subscribe`.
    handlers: Arc<RwLock<HandlerMap>>,

    /// Published-but-unfinished events.
    completion: Arc<CompletionBarrier>,

    counters: Arc<BusCounters>,

    /// Delivery worker; taken by `close`.
    worker: Mutex<Option<JoinHandle<()>>>,

    capacity: usize,
}

impl EventBus {
    /// Create a bus with the default queue capacity.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime, which hosts the worker.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a bus whose delivery queue holds at most `capacity` events.
    ///
    /// A capacity of zero is treated as one.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime, which hosts the worker.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let handlers: Arc<RwLock<HandlerMap>> = Arc::new(RwLock::new(HashMap::new()));
        let completion = Arc::new(CompletionBarrier::new());
        let counters = Arc::new(BusCounters::default());

        let worker = tokio::spawn(run_worker(
            receiver,
            Arc::clone(&handlers),
            Arc::clone(&completion),
            Arc::clone(&counters),
        ));

        debug!(capacity, "Event bus started");

        Self {
            sender: Mutex::new(Some(sender)),
            handlers,
            completion,
            counters,
            worker: Mutex::new(Some(worker)),
            capacity,
        }
    }

    /// Register `handler` for events of `event_type`.
    ///
    /// Duplicate registrations are kept and fire once each.
    pub fn subscribe(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let event_type = event_type.into();
        let mut handlers = self.handlers.write();
        let entry = handlers.entry(event_type.clone()).or_default();
        entry.push(handler);
        debug!(event_type = %event_type, handlers = entry.len(), "Handler subscribed");
    }

    /// Register an async closure for events of `event_type`.
    pub fn subscribe_fn<F, Fut>(&self, event_type: impl Into<String>, func: F)
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.subscribe(event_type, Arc::new(handler_fn(func)));
    }

    /// Enqueue an event for asynchronous delivery.
    ///
    /// Returns as soon as the event is on the queue; waits only while the
    /// queue is full. Dropping the returned future before it completes leaves
    /// the completion count untouched.
    pub async fn publish(&self, event: Event) -> Result<(), BusError> {
        self.enqueue(event).await
    }

    /// Enqueue without waiting, failing with [`BusError::Full`] at capacity.
    pub fn try_publish(&self, event: Event) -> Result<(), BusError> {
        let sender = self.current_sender()?;
        let guard = PendingGuard::acquire(Arc::clone(&self.completion));

        match sender.try_send(event) {
            Ok(()) => {
                guard.hand_off();
                self.counters.published.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                trace!(event_type = %event.event_type(), "Event queue full");
                Err(BusError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(BusError::Closed),
        }
    }

    /// Resolve once every event published so far has been fully dispatched.
    ///
    /// Events published while waiting are included.
    pub async fn wait(&self) {
        self.completion.wait().await;
    }

    /// Stop accepting events, drain the queue, and stop the worker.
    ///
    /// Events already queued (or being enqueued by a blocked publisher) are
    /// still delivered before this returns.
    pub async fn close(&self) {
        let sender = self.sender.lock().take();
        if sender.is_none() {
            trace!("Event bus already closed");
        }
        drop(sender);

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Event bus worker terminated abnormally");
            }
            debug!("Event bus closed");
        }
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Number of handlers registered for `event_type`.
    #[must_use]
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.read().get(event_type).map_or(0, Vec::len)
    }

    /// Event types with at least one handler, sorted.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// Queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the bus counters.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        BusStats {
            published: self.counters.published.load(Ordering::Relaxed),
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            handler_failures: self.counters.handler_failures.load(Ordering::Relaxed),
            in_flight: self.completion.pending(),
        }
    }

    fn current_sender(&self) -> Result<mpsc::Sender<Event>, BusError> {
        self.sender.lock().clone().ok_or(BusError::Closed)
    }

    async fn enqueue(&self, event: Event) -> Result<(), BusError> {
        let sender = self.current_sender()?;
        // Counted before the send so a concurrent `wait` cannot miss it.
        let guard = PendingGuard::acquire(Arc::clone(&self.completion));

        let event_type = event.event_type().to_owned();
        sender.send(event).await.map_err(|_| BusError::Closed)?;
        guard.hand_off();

        self.counters.published.fetch_add(1, Ordering::Relaxed);
        trace!(event_type = %event_type, "Event published");
        Ok(())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, event: Event) -> Result<(), BusError> {
        self.enqueue(event).await
    }

    fn events_published(&self) -> u64 {
        self.counters.published.load(Ordering::Relaxed)
    }
}

/// Drain the queue until every sender is gone.
async fn run_worker(
    mut receiver: mpsc::Receiver<Event>,
    handlers: Arc<RwLock<HandlerMap>>,
    completion: Arc<CompletionBarrier>,
    counters: Arc<BusCounters>,
) {
    while let Some(event) = receiver.recv().await {
        let _done = PendingGuard::adopt(Arc::clone(&completion));

        // Clone the list so the read lock is not held while handlers run.
        let subscribed = handlers.read().get(event.event_type()).cloned();

        match subscribed {
            Some(list) => {
                for handler in list {
                    dispatch(handler.as_ref(), &event, &counters).await;
                }
            }
            None => trace!(event_type = %event.event_type(), "No handlers for event"),
        }

        counters.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    debug!("Event bus worker stopped");
}

/// Run one handler, isolating errors and panics from the worker.
async fn dispatch(handler: &dyn EventHandler, event: &Event, counters: &BusCounters) {
    match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            counters.handler_failures.fetch_add(1, Ordering::Relaxed);
            warn!(event_type = %event.event_type(), error = %e, "Event handler failed");
        }
        Err(_) => {
            counters.handler_failures.fetch_add(1, Ordering::Relaxed);
            error!(event_type = %event.event_type(), "Event handler panicked");
        }
    }
}
