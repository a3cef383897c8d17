//! # Observable
//!
//! A minimal publish/subscribe cell. The form layer's edit stream is an
//! `Observable<FieldChange>`; the controller publishes results on an
//! `Observable<TotalsChanged>`.
//!
//! Callbacks run synchronously on the notifying thread. The subscriber list
//! is copied before dispatch, so a callback may subscribe or unsubscribe
//! without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Handle returned by [`Observable::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A list of callbacks interested in events of type `E`.
pub struct Observable<E> {
    subscribers: RwLock<Vec<(SubscriptionId, Callback<E>)>>,
    next_id: AtomicU64,
}

impl<E> Observable<E> {
    pub fn new() -> Self {
        Observable {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a callback and returns its handle.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Removes a callback. Returns false if the handle was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Calls every subscriber with `event`, in subscription order.
    pub fn notify(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<E> Default for Observable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Observable<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
