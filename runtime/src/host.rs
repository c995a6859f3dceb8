//! Host store interface
//!
//! The dispatch loop does not own state itself. It wraps a host store that
//! holds the current model, applies a plain `(state, action) -> state`
//! reducer and notifies subscribers. [`BasicStore`] is the in-process host
//! used by default; anything implementing [`HostStore`] can take its place.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Plain reducer as seen by the host: no commands, just the next state
pub type HostReducer<S, A> = Box<dyn Fn(&S, A) -> S + Send + Sync>;

/// Callback invoked after every committed dispatch
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Identifies a subscription for [`HostStore::unsubscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The state container the dispatch loop wraps
///
/// `commit` must apply the reducer and commit the result before returning,
/// so that `get_state` immediately reflects it. Listeners are called from
/// `notify` only, which the loop invokes once it no longer holds its own locks.
pub trait HostStore<S, A>: Send + Sync {
    /// Apply the installed reducer to the current state and commit the result
    fn commit(&self, action: A);

    /// Call every registered listener
    fn notify(&self);

    /// Commit, then notify
    fn dispatch(&self, action: A) {
        self.commit(action);
        self.notify();
    }

    /// The current state
    fn get_state(&self) -> Arc<S>;

    /// Register a listener called after every dispatch
    fn subscribe(&self, listener: Listener) -> SubscriptionId;

    /// Remove a listener; returns whether it was registered
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Install a new reducer for subsequent dispatches
    fn replace_reducer(&self, reducer: HostReducer<S, A>);
}

/// Minimal in-process host store
pub struct BasicStore<S, A> {
    state: RwLock<Arc<S>>,
    reducer: RwLock<HostReducer<S, A>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl<S, A> BasicStore<S, A> {
    /// Create a host holding `initial` and applying `reducer`
    #[must_use]
    pub fn new(reducer: HostReducer<S, A>, initial: S) -> Self {
        Self {
            state: RwLock::new(Arc::new(initial)),
            reducer: RwLock::new(reducer),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<S, A> HostStore<S, A> for BasicStore<S, A>
where
    S: Send + Sync,
    A: Send,
{
    fn commit(&self, action: A) {
        let reducer = self.reducer.read().unwrap_or_else(PoisonError::into_inner);
        let current = self.get_state();
        let next = reducer(&current, action);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }

    fn notify(&self) {
        // Listeners run outside the lock so they may (un)subscribe
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener();
        }
    }

    fn get_state(&self) -> Arc<S> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn replace_reducer(&self, reducer: HostReducer<S, A>) {
        *self.reducer.write().unwrap_or_else(PoisonError::into_inner) = reducer;
    }
}

impl<S, A> fmt::Debug for BasicStore<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicStore")
            .field(
                "listeners",
                &self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn adder() -> BasicStore<i32, i32> {
        BasicStore::new(Box::new(|state: &i32, n: i32| state + n), 0)
    }

    #[test]
    fn test_dispatch_commits_before_returning() {
        let host = adder();
        host.dispatch(2);
        host.dispatch(3);
        assert_eq!(*host.get_state(), 5);
    }

    #[test]
    fn test_listeners_are_notified_until_unsubscribed() {
        let host = adder();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = host.subscribe(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        host.dispatch(1);
        assert!(host.unsubscribe(id));
        assert!(!host.unsubscribe(id));
        host.dispatch(1);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replace_reducer() {
        let host = adder();
        host.dispatch(2);
        host.replace_reducer(Box::new(|state: &i32, n: i32| state * n));
        host.dispatch(10);
        assert_eq!(*host.get_state(), 20);
    }
}
