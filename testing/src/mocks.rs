//! Mock hosts and call recorders
//!
//! [`RecordingHost`] stands in for the default host and keeps every action
//! that reaches it, in commit order. [`CallLog`] is a shareable list of
//! entries commands can push to, for asserting invocation order.

use reloop_core::Action;
use reloop_runtime::{BasicStore, HostReducer, HostStore, Listener, SubscriptionId};
use std::sync::{Arc, Mutex, PoisonError};

/// Host store that records every dispatched action
///
/// # Example
///
/// ```ignore
/// use reloop_runtime::{LoopConfig, Store};
/// use reloop_testing::RecordingHost;
///
/// let store = Store::with_host(initial, reducer, env, LoopConfig::default(), RecordingHost::new);
/// store.dispatch(Action::Start).await?;
///
/// assert_eq!(store.host().action_types(), ["START", "STARTED"]);
/// ```
pub struct RecordingHost<S, A> {
    inner: BasicStore<S, A>,
    log: Mutex<Vec<A>>,
}

impl<S, A> RecordingHost<S, A>
where
    S: Send + Sync,
    A: Action,
{
    /// Create a recording host, with the signature `Store::with_host` expects
    #[must_use]
    pub fn new(reducer: HostReducer<S, A>, initial: S) -> Self {
        Self {
            inner: BasicStore::new(reducer, initial),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Every action dispatched so far, in commit order
    #[must_use]
    pub fn actions(&self) -> Vec<A> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Type names of every action dispatched so far
    #[must_use]
    pub fn action_types(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|action| action.action_type().to_string())
            .collect()
    }

    /// Forget the recorded actions
    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl<S, A> HostStore<S, A> for RecordingHost<S, A>
where
    S: Send + Sync,
    A: Action,
{
    fn commit(&self, action: A) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action.clone());
        self.inner.commit(action);
    }

    fn notify(&self) {
        self.inner.notify();
    }

    fn get_state(&self) -> Arc<S> {
        self.inner.get_state()
    }

    fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.inner.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }

    fn replace_reducer(&self, reducer: HostReducer<S, A>) {
        self.inner.replace_reducer(reducer);
    }
}

impl<S, A: Action> std::fmt::Debug for RecordingHost<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingHost")
            .field("recorded", &self.log.lock().unwrap_or_else(PoisonError::into_inner).len())
            .finish_non_exhaustive()
    }
}

/// Shared, ordered record of calls
///
/// Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// All entries, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of entries equal to `entry`
    #[must_use]
    pub fn count(&self, entry: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|recorded| recorded.as_str() == entry)
            .count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_host_keeps_commit_order() {
        let host: RecordingHost<i32, &'static str> = RecordingHost::new(
            Box::new(|state: &i32, action: &'static str| match action {
                "ADD" => state + 1,
                _ => *state,
            }),
            0,
        );

        host.dispatch("ADD");
        host.dispatch("NOOP");
        host.dispatch("ADD");

        assert_eq!(*host.get_state(), 2);
        assert_eq!(host.actions(), vec!["ADD", "NOOP", "ADD"]);
        assert_eq!(host.action_types(), vec!["ADD", "NOOP", "ADD"]);

        host.clear();
        assert!(host.actions().is_empty());
    }

    #[test]
    fn test_call_log_is_shared_between_clones() {
        let log = CallLog::new();
        let other = log.clone();

        log.record("first");
        other.record("second");
        other.record("first");

        assert_eq!(log.entries(), vec!["first", "second", "first"]);
        assert_eq!(log.count("first"), 2);
    }
}
