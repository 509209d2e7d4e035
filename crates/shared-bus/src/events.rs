//! # Bus Events
//!
//! An [`Event`] is an immutable `(event_type, payload)` record. The type is a
//! stable string discriminator (`"user.created"`); the payload is whatever the
//! publisher put in and is recovered by downcasting to the same Rust type.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased, shareable event payload.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// A single event flowing through the bus.
///
/// Events are cheap to clone: the payload is reference counted and never
/// mutated after construction.
#[derive(Clone)]
pub struct Event {
    event_type: String,
    payload: Payload,
}

impl Event {
    /// Create an event carrying `payload`.
    pub fn new<T>(event_type: impl Into<String>, payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            event_type: event_type.into(),
            payload: Arc::new(payload),
        }
    }

    /// Create an event from an already shared payload.
    pub fn from_shared(event_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    /// The event type discriminator.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Borrow the payload as `T`, or `None` if it was published as another type.
    #[must_use]
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// The raw shared payload.
    #[must_use]
    pub fn shared_payload(&self) -> Payload {
        Arc::clone(&self.payload)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}
