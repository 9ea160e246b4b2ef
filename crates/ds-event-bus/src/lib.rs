//! Publish/subscribe keyed by event name.
//!
//! Delivery is synchronous, in the thread that calls [`EventBus::emit`].
//! A subscriber that panics is caught and logged; it never prevents
//! delivery to the remaining subscribers for that event.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Opaque subscription handle returned by [`EventBus::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Entry<E> {
    id: SubscriptionId,
    handler: Handler<E>,
}

impl<E> Clone for Entry<E> {
    fn clone(&self) -> Self {
        Entry {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// A synchronous, panic-isolating event bus generic over a payload type `E`.
///
/// `E` is typically a small `Clone`-able enum owned by the caller (e.g.
/// the Connection Core's lifecycle event type); the bus itself carries no
/// opinion about what events exist, only how they're routed by name.
pub struct EventBus<E> {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<String, Vec<Entry<E>>>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        EventBus {
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe `handler` to events published under `name`.
    pub fn on(&self, name: impl Into<String>, handler: impl Fn(&E) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap()
            .entry(name.into())
            .or_default()
            .push(Entry {
                id,
                handler: Arc::new(handler),
            });
        id
    }

    /// Unsubscribe a handler previously returned by [`EventBus::on`].
    /// A no-op if `id` is unknown or already removed.
    pub fn off(&self, id: SubscriptionId) {
        let mut subscribers = self.subscribers.lock().unwrap();
        for entries in subscribers.values_mut() {
            entries.retain(|e| e.id != id);
        }
    }

    /// Deliver `payload` to every subscriber registered under `name`, in
    /// subscription order. A subscriber panic is caught and logged, and
    /// does not stop delivery to the rest.
    pub fn emit(&self, name: &str, payload: &E) {
        // Clone the handler list out from under the lock so a handler that
        // re-enters `on`/`off` (or another `emit`) doesn't deadlock.
        let entries: Vec<Entry<E>> = {
            let subscribers = self.subscribers.lock().unwrap();
            match subscribers.get(name) {
                Some(entries) => entries.clone(),
                None => return,
            }
        };
        for entry in &entries {
            let result = panic::catch_unwind(AssertUnwindSafe(|| (entry.handler)(payload)));
            if let Err(panic) = result {
                let message = panic_message(&panic);
                tracing::error!(event = %name, %message, "event bus subscriber panicked");
            }
        }
    }

    /// Number of subscribers currently registered under `name`.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .get(name)
            .map_or(0, |v| v.len())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
