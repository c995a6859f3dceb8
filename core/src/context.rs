//! Dependency injection for running commands
//!
//! `Run` commands may ask for the live `dispatch` and `get_state` of the store
//! that executes them by placing [`Arg::Dispatch`] or [`Arg::GetState`] in their
//! argument list. The interpreter substitutes those sentinels from the
//! [`Context`] it was given before invoking the function, so the function only
//! ever sees [`Injected`] values.

use crate::error::LoopError;
use anyhow::{anyhow, bail};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Future returned by [`Dispatch::send`]
///
/// Resolves once the dispatched action and every command it triggered have settled.
pub type DispatchFuture = BoxFuture<'static, Result<(), LoopError>>;

/// Function that rewrites an inner action into an outer action
pub type Tagger<B, A> = Arc<dyn Fn(B) -> A + Send + Sync>;

/// Handle to a store's dispatch entry point
///
/// Sending performs the synchronous part of the dispatch (reducer call and
/// state commit) immediately; the returned future only tracks the effects.
pub struct Dispatch<A> {
    inner: Arc<dyn Fn(A) -> DispatchFuture + Send + Sync>,
}

impl<A: 'static> Dispatch<A> {
    /// Wrap a dispatch function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) -> DispatchFuture + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Dispatch an action
    pub fn send(&self, action: A) -> DispatchFuture {
        (self.inner)(action)
    }

    /// Derive a dispatch for inner actions that tags each one before
    /// forwarding it here
    #[must_use]
    pub fn map<B: 'static>(&self, tagger: Tagger<B, A>) -> Dispatch<B> {
        let outer = self.clone();
        Dispatch::new(move |action: B| outer.send(tagger(action)))
    }
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatch(<fn>)")
    }
}

/// Handle to a store's current state
///
/// The state type is erased so that commands of any action type can carry it;
/// [`GetState::get`] recovers it by type.
#[derive(Clone)]
pub struct GetState {
    inner: Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>,
}

impl GetState {
    /// Wrap a state reader
    pub fn new<S, F>(f: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move || {
                let state: Arc<dyn Any + Send + Sync> = f();
                state
            }),
        }
    }

    /// Reader for contexts that have no store behind them; always yields `()`
    #[must_use]
    pub fn detached() -> Self {
        Self::new(|| Arc::new(()))
    }

    /// Read the current state, if it is an `S`
    #[must_use]
    pub fn get<S: Any + Send + Sync>(&self) -> Option<Arc<S>> {
        (self.inner)().downcast::<S>().ok()
    }
}

impl fmt::Debug for GetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GetState(<fn>)")
    }
}

/// Argument of a `Run` command as written by the reducer
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Plain value handed to the function unchanged
    Value(serde_json::Value),
    /// Replaced by the executing store's [`Dispatch`]
    Dispatch,
    /// Replaced by the executing store's [`GetState`]
    GetState,
}

impl Arg {
    /// Plain value argument
    pub fn value(value: impl Into<serde_json::Value>) -> Self {
        Self::Value(value.into())
    }

    /// Serialize any value into an argument
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `value` cannot be represented as JSON.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Value)
    }

    /// Whether this is one of the injectable sentinels
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        matches!(self, Self::Dispatch | Self::GetState)
    }
}

impl From<serde_json::Value> for Arg {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}

/// Argument after sentinel substitution
pub enum Injected<A> {
    /// Plain value
    Value(serde_json::Value),
    /// Live dispatch of the executing store
    Dispatch(Dispatch<A>),
    /// Live state reader of the executing store
    GetState(GetState),
}

impl<A> fmt::Debug for Injected<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Injected::Value").field(value).finish(),
            Self::Dispatch(dispatch) => f.debug_tuple("Injected::Dispatch").field(dispatch).finish(),
            Self::GetState(get_state) => {
                f.debug_tuple("Injected::GetState").field(get_state).finish()
            },
        }
    }
}

/// Arguments handed to a `Run` function
#[derive(Debug)]
pub struct Args<A> {
    items: Vec<Injected<A>>,
}

impl<A: 'static> Args<A> {
    /// Number of arguments
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no arguments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Raw access to an argument
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Injected<A>> {
        self.items.get(index)
    }

    /// Deserialize the value argument at `index`
    ///
    /// # Errors
    ///
    /// Fails if there is no argument at `index`, if it is an injected
    /// dependency, or if it does not deserialize into `T`.
    pub fn value<T: DeserializeOwned>(&self, index: usize) -> anyhow::Result<T> {
        match self.items.get(index) {
            Some(Injected::Value(value)) => Ok(T::deserialize(value)?),
            Some(other) => bail!("argument {index} is not a value: {other:?}"),
            None => Err(anyhow!("missing argument {index}")),
        }
    }

    /// The injected dispatch at `index`
    ///
    /// # Errors
    ///
    /// Fails if the argument at `index` is missing or is not [`Arg::Dispatch`].
    pub fn dispatch(&self, index: usize) -> anyhow::Result<Dispatch<A>> {
        match self.items.get(index) {
            Some(Injected::Dispatch(dispatch)) => Ok(dispatch.clone()),
            _ => bail!("argument {index} is not an injected dispatch"),
        }
    }

    /// The injected state reader at `index`
    ///
    /// # Errors
    ///
    /// Fails if the argument at `index` is missing or is not [`Arg::GetState`].
    pub fn get_state(&self, index: usize) -> anyhow::Result<GetState> {
        match self.items.get(index) {
            Some(Injected::GetState(get_state)) => Ok(get_state.clone()),
            _ => bail!("argument {index} is not an injected state reader"),
        }
    }

    /// Take the arguments
    #[must_use]
    pub fn into_vec(self) -> Vec<Injected<A>> {
        self.items
    }
}

impl<A> IntoIterator for Args<A> {
    type Item = Injected<A>;
    type IntoIter = std::vec::IntoIter<Injected<A>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Everything the interpreter needs from the store executing a command
pub struct Context<A> {
    dispatch: Dispatch<A>,
    get_state: GetState,
    log_handled_failures: bool,
}

impl<A: 'static> Context<A> {
    /// Build a context from a store's dispatch and state reader
    ///
    /// Handled failures are logged by default.
    #[must_use]
    pub const fn new(dispatch: Dispatch<A>, get_state: GetState) -> Self {
        Self {
            dispatch,
            get_state,
            log_handled_failures: true,
        }
    }

    /// Toggle the diagnostic emitted when a fail creator handles a failure
    #[must_use]
    pub const fn with_log_handled_failures(mut self, enabled: bool) -> Self {
        self.log_handled_failures = enabled;
        self
    }

    /// The dispatch commands run against
    #[must_use]
    pub const fn dispatch(&self) -> &Dispatch<A> {
        &self.dispatch
    }

    /// The state reader commands run against
    #[must_use]
    pub const fn get_state(&self) -> &GetState {
        &self.get_state
    }

    /// Whether handled failures are logged
    #[must_use]
    pub const fn log_handled_failures(&self) -> bool {
        self.log_handled_failures
    }

    /// Context for a nested command whose actions are tagged into this one
    pub(crate) fn map<B: 'static>(&self, tagger: Tagger<B, A>) -> Context<B> {
        Context {
            dispatch: self.dispatch.map(tagger),
            get_state: self.get_state.clone(),
            log_handled_failures: self.log_handled_failures,
        }
    }

    /// Substitute sentinels with the live dependencies
    pub(crate) fn inject(&self, args: Vec<Arg>) -> Args<A> {
        let items = args
            .into_iter()
            .map(|arg| match arg {
                Arg::Value(value) => Injected::Value(value),
                Arg::Dispatch => Injected::Dispatch(self.dispatch.clone()),
                Arg::GetState => Injected::GetState(self.get_state.clone()),
            })
            .collect();
        Args { items }
    }
}

impl<A> Clone for Context<A> {
    fn clone(&self) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
            get_state: self.get_state.clone(),
            log_handled_failures: self.log_handled_failures,
        }
    }
}

impl<A> fmt::Debug for Context<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("log_handled_failures", &self.log_handled_failures)
            .finish_non_exhaustive()
    }
}
