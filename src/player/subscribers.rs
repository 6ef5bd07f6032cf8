//! Per-instance subscriber sets.
//!
//! Each clock and player owns its own set of observers; subscribing hands
//! back a `Subscription` that unsubscribes on drop, so nothing outlives
//! the component it watches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Registry<T> = Arc<Mutex<HashMap<u64, Callback<T>>>>;

/// A set of callbacks observing values of type `T`.
pub struct Subscribers<T> {
    registry: Registry<T>,
    next_id: Arc<AtomicU64>,
}

impl<T: 'static> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Subscribers<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

// `subscribe` hands the registry to a `'static` disposer, so `T` itself
// must not borrow anything shorter-lived.
impl<T: 'static> Subscribers<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register an observer. Dropping the returned `Subscription` removes
    /// it again.
    #[must_use = "dropping the subscription unsubscribes the observer"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .lock()
            .expect("subscriber registry poisoned")
            .insert(id, Arc::new(callback));

        let registry = Arc::clone(&self.registry);
        Subscription {
            unsubscribe: Box::new(move || {
                registry
                    .lock()
                    .expect("subscriber registry poisoned")
                    .remove(&id);
            }),
        }
    }

    /// Invoke every registered observer with `value`.
    ///
    /// Callbacks run outside the registry lock, so an observer may
    /// subscribe or unsubscribe from within its own callback.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self
            .registry
            .lock()
            .expect("subscriber registry poisoned")
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .expect("subscriber registry poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Disposer for one registered observer.
pub struct Subscription {
    unsubscribe: Box<dyn FnOnce() + Send>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let unsubscribe = std::mem::replace(&mut self.unsubscribe, Box::new(|| {}));
        unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Subscription")
    }
}
