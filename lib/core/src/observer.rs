//! Synchronous publish/subscribe fan-out.
//!
//! An [`Emitter`] delivers each emitted value to every current listener, in
//! subscription order, before `emit` returns. Subscribing yields a
//! [`SubscriptionId`] that is later handed back to [`Emitter::unsubscribe`].
//!
//! Listeners are invoked outside the internal lock, so a listener may
//! subscribe or unsubscribe (including itself) while being notified. Such
//! changes take effect from the next emission.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Token identifying one subscription on an [`Emitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Ordered set of listeners for values of type `T`.
pub struct Emitter<T> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
}

impl<T> Emitter<T> {
    /// Creates an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Registers a listener and returns its subscription token.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        tracing::trace!(subscription = %id, "listener subscribed");
        id
    }

    /// Removes a listener.
    ///
    /// Returns `false` if the token was unknown (already removed, or issued
    /// by another emitter).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        let removed = listeners.len() != before;
        if removed {
            tracing::trace!(subscription = %id, "listener unsubscribed");
        }
        removed
    }

    /// Delivers `value` to every listener subscribed at the time of the call.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(value);
        }
    }

    /// Drops every listener.
    pub fn clear(&self) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns the number of current listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_reaches_all_listeners_in_order() {
        let emitter = Emitter::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        emitter.subscribe(move |v| first.lock().unwrap().push(("first", *v)));
        let second = Arc::clone(&seen);
        emitter.subscribe(move |v| second.lock().unwrap().push(("second", *v)));

        emitter.emit(&7);

        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let emitter = Emitter::<u32>::new();
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let id = emitter.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit(&1);
        assert!(emitter.unsubscribe(id));
        emitter.emit(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!emitter.unsubscribe(id));
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let emitter = Arc::new(Emitter::<u32>::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let inner_emitter = Arc::clone(&emitter);
        let inner_slot = Arc::clone(&slot);
        let id = emitter.subscribe(move |_| {
            if let Some(id) = *inner_slot.lock().unwrap() {
                inner_emitter.unsubscribe(id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        emitter.emit(&1);
        assert_eq!(emitter.listener_count(), 0);
    }
}
