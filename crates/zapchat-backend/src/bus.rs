//! In-process publish/subscribe registry.
//!
//! Handlers for one event kind fire synchronously, in subscription order,
//! on the publishing thread.  There is no queueing and no redelivery.
//! Subscribing the same closure twice registers it twice; it is the
//! subscriber's job to unsubscribe on teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::events::{ChatEvent, EventKind};

type Handler = Arc<dyn Fn(&ChatEvent) + Send + Sync>;

struct Registration {
    id: u64,
    handler: Handler,
}

/// Token identifying one registration; pass it back to
/// [`EventBus::unsubscribe`] to remove exactly that handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

/// Event registry mapping event kinds to ordered handler lists.
pub struct EventBus {
    registrations: Mutex<HashMap<EventKind, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            registrations: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&ChatEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut registrations = self.lock();
        registrations.entry(kind).or_default().push(Registration {
            id,
            handler: Arc::new(handler),
        });
        Subscription { kind, id }
    }

    /// Remove a registration.  Returns `false` if it was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut registrations = self.lock();
        match registrations.get_mut(&subscription.kind) {
            Some(handlers) => {
                let before = handlers.len();
                handlers.retain(|r| r.id != subscription.id);
                handlers.len() != before
            }
            None => false,
        }
    }

    /// Deliver an event to every handler subscribed to its kind, in
    /// subscription order, on the calling thread.
    pub fn publish(&self, event: &ChatEvent) {
        // Snapshot so handlers may subscribe or unsubscribe re-entrantly.
        let handlers: Vec<Handler> = {
            let registrations = self.lock();
            registrations
                .get(&event.kind())
                .map(|hs| hs.iter().map(|r| Arc::clone(&r.handler)).collect())
                .unwrap_or_default()
        };

        if handlers.is_empty() {
            tracing::trace!(kind = ?event.kind(), "event published with no subscribers");
        }
        for handler in handlers {
            handler(event);
        }
    }

    /// Number of live registrations for one event kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.lock().get(&kind).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<EventKind, Vec<Registration>>> {
        self.registrations.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
