//! The dispatch loop
//!
//! [`Store`] wraps a host store so that reducers may return `(model, command)`
//! pairs. Each dispatch:
//!
//! 1. applies the reducer through the host, committing the new model,
//! 2. takes the commands queued by that reducer call (swap and clear),
//! 3. notifies the host's listeners,
//! 4. hands the commands to the interpreter, and
//! 5. re-dispatches every resulting action through the same loop.
//!
//! Steps 1 to 4 happen before [`Store::dispatch`] returns. Whatever is still
//! pending after step 4 runs on a spawned tokio task, tracked by the returned
//! [`DispatchHandle`]. Outside a tokio runtime it is polled once in place
//! instead, so cascades that never wait settle without one.

use crate::config::LoopConfig;
use crate::host::{BasicStore, HostReducer, HostStore, Listener, SubscriptionId};
use crate::metrics::{CommandMetrics, ReducerMetrics};
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use futures::task::noop_waker_ref;
use reloop_core::interpreter::ActionsFuture;
use reloop_core::{Action, Cmd, Context, Dispatch, GetState, Loop, LoopError, Reducer, execute};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// A command waiting to be executed, with the type of the action whose
/// reducer call emitted it
struct PendingCmd<A> {
    action_type: String,
    cmd: Cmd<A>,
}

type Queue<A> = Arc<Mutex<Vec<PendingCmd<A>>>>;

/// Handle for tracking a dispatch
///
/// Returned by [`Store::dispatch`]. Resolves once every command triggered by
/// the action (directly or through derived actions) has settled. Dropping the
/// handle does not stop the work.
///
/// # Example
///
/// ```ignore
/// store.dispatch(Action::Load).await?;
/// // Every command emitted for Action::Load, and for the actions it produced, is done
/// ```
#[must_use = "a dispatch handle reports command failures only when awaited"]
pub struct DispatchHandle {
    state: HandleState,
}

enum HandleState {
    Ready(Option<Result<(), LoopError>>),
    Spawned(JoinHandle<Result<(), LoopError>>),
}

impl DispatchHandle {
    /// A handle that has already settled
    pub const fn ready(result: Result<(), LoopError>) -> Self {
        Self {
            state: HandleState::Ready(Some(result)),
        }
    }

    fn spawn(mut work: BoxFuture<'static, Result<(), LoopError>>) -> Self {
        if let Ok(runtime) = Handle::try_current() {
            return Self {
                state: HandleState::Spawned(runtime.spawn(work)),
            };
        }

        let mut cx = TaskContext::from_waker(noop_waker_ref());
        match work.poll_unpin(&mut cx) {
            Poll::Ready(result) => Self::ready(result),
            Poll::Pending => {
                tracing::error!("Commands with asynchronous work were dispatched outside a tokio runtime");
                Self::ready(Err(LoopError::TaskFailed(
                    "no tokio runtime to run commands on".to_string(),
                )))
            },
        }
    }

    /// Whether the dispatch has settled
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.state {
            HandleState::Ready(_) => true,
            HandleState::Spawned(task) => task.is_finished(),
        }
    }
}

impl Future for DispatchHandle {
    type Output = Result<(), LoopError>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            HandleState::Ready(result) => Poll::Ready(result.take().unwrap_or(Ok(()))),
            HandleState::Spawned(task) => Pin::new(task).poll(cx).map(|joined| {
                joined.unwrap_or_else(|error| {
                    tracing::error!(error = %error, "Dispatch task failed");
                    Err(LoopError::TaskFailed(error.to_string()))
                })
            }),
        }
    }
}

impl fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// The Store - dispatch loop around a host store
///
/// The Store manages:
/// 1. The host store (state, subscribers)
/// 2. The reducer, lifted so that its commands are queued
/// 3. The environment handed to every reducer call
/// 4. Command execution (with feedback loop)
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type
/// - `R`: Reducer implementation
/// - `H`: Host store, [`BasicStore`] unless built with [`Store::with_host`]
///
/// # Example
///
/// ```ignore
/// let store = Store::new(Counter::default(), CounterReducer, ());
///
/// store.dispatch(CounterAction::IncrementLater).await?;
/// assert_eq!(store.get_state().value, 1);
/// ```
pub struct Store<S, A, E, R, H = BasicStore<S, A>> {
    inner: Arc<Inner<S, A, E, H>>,
    _reducer: PhantomData<fn() -> R>,
}

struct Inner<S, A, E, H> {
    host: H,
    queue: Queue<A>,
    /// Serialises host dispatch with the queue swap
    dispatch_lock: Mutex<()>,
    environment: Arc<E>,
    config: LoopConfig,
    init: Mutex<Option<DispatchHandle>>,
    _state: PhantomData<fn() -> S>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    S: Send + Sync + 'static,
    A: Action,
    E: Send + Sync + 'static,
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
{
    /// Create a store over a [`BasicStore`] with default configuration
    ///
    /// The command of `initial` (if any) starts executing right away; see
    /// [`Store::initialized`].
    ///
    /// # Arguments
    ///
    /// - `initial`: Initial model, or a [`Loop`] carrying an initial command
    /// - `reducer`: The reducer implementation
    /// - `environment`: Extra arguments handed to every reducer call
    pub fn new(initial: impl Into<Loop<S, A>>, reducer: R, environment: E) -> Self {
        Self::with_config(initial, reducer, environment, LoopConfig::default())
    }

    /// Create a store over a [`BasicStore`] with custom configuration
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = LoopConfig::default().with_log_handled_failures(false);
    /// let store = Store::with_config(Counter::default(), CounterReducer, (), config);
    /// ```
    pub fn with_config(
        initial: impl Into<Loop<S, A>>,
        reducer: R,
        environment: E,
        config: LoopConfig,
    ) -> Self {
        Self::with_host(initial, reducer, environment, config, BasicStore::new)
    }
}

impl<S, A, E, R, H> Store<S, A, E, R, H>
where
    S: Send + Sync + 'static,
    A: Action,
    E: Send + Sync + 'static,
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    H: HostStore<S, A> + 'static,
{
    /// Create a store over a custom host
    ///
    /// `create_host` receives the lifted reducer and the initial model and
    /// builds the host the loop wraps.
    pub fn with_host<F>(
        initial: impl Into<Loop<S, A>>,
        reducer: R,
        environment: E,
        config: LoopConfig,
        create_host: F,
    ) -> Self
    where
        F: FnOnce(HostReducer<S, A>, S) -> H,
    {
        let (model, init_cmd) = initial.into().into_parts();
        let queue: Queue<A> = Arc::default();
        let environment = Arc::new(environment);
        let host = create_host(
            lift(Arc::new(reducer), Arc::clone(&environment), Arc::clone(&queue)),
            model,
        );

        let store = Self {
            inner: Arc::new(Inner {
                host,
                queue,
                dispatch_lock: Mutex::new(()),
                environment,
                config,
                init: Mutex::new(None),
                _state: PhantomData,
            }),
            _reducer: PhantomData,
        };

        let init = store.drain(
            vec![PendingCmd {
                action_type: store.inner.config.init_action_type.clone(),
                cmd: init_cmd,
            }],
            0,
        );
        *store.inner.init.lock().unwrap_or_else(PoisonError::into_inner) = Some(init);

        store
    }

    /// Wait for the initial command to settle
    ///
    /// Only the first call observes its failure; later calls return `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns the failure of the initial command, if it failed unhandled.
    pub async fn initialized(&self) -> Result<(), LoopError> {
        let init = self
            .inner
            .init
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match init {
            Some(handle) => handle.await,
            None => Ok(()),
        }
    }

    /// Dispatch an action
    ///
    /// This method:
    /// 1. Applies the reducer and commits the new state
    /// 2. Starts the commands the reducer returned
    /// 3. Re-dispatches their resulting actions as they arrive
    ///
    /// # Returns
    ///
    /// A [`DispatchHandle`] resolving once the whole cascade has settled, or
    /// to the first command failure no fail creator handled.
    ///
    /// # Concurrency
    ///
    /// - The state is committed before `dispatch` returns
    /// - `Run` functions reachable without waiting are invoked before `dispatch` returns
    /// - Asynchronous work continues on a spawned task, which needs a tokio runtime
    ///
    /// # Panics
    ///
    /// If the reducer panics, the panic propagates to the caller. Reducers
    /// should be pure functions that do not panic.
    #[tracing::instrument(skip(self, action), fields(action_type = action.action_type()), name = "store_dispatch")]
    pub fn dispatch(&self, action: A) -> DispatchHandle {
        self.dispatch_at(action, 0)
    }

    /// The current state
    #[must_use]
    pub fn get_state(&self) -> Arc<S> {
        self.inner.host.get_state()
    }

    /// Register a listener called after every committed dispatch
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        self.inner.host.subscribe(listener)
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.host.unsubscribe(id)
    }

    /// Install a new reducer
    ///
    /// Commands already queued or running are unaffected.
    pub fn replace_reducer(&self, reducer: R) {
        tracing::debug!("Replacing reducer");
        self.inner.host.replace_reducer(lift(
            Arc::new(reducer),
            Arc::clone(&self.inner.environment),
            Arc::clone(&self.inner.queue),
        ));
    }

    /// The configuration this store was built with
    #[must_use]
    pub fn config(&self) -> &LoopConfig {
        &self.inner.config
    }

    /// The underlying host store
    #[must_use]
    pub fn host(&self) -> &H {
        &self.inner.host
    }

    fn dispatch_at(&self, action: A, depth: usize) -> DispatchHandle {
        if let Some(limit) = self.inner.config.max_cascade_depth {
            if depth > limit {
                let action_type = action.action_type().to_string();
                tracing::error!(action_type = %action_type, limit, "Dispatch cascade exceeded depth limit");
                ReducerMetrics::record_cascade_limit();
                return DispatchHandle::ready(Err(LoopError::CascadeTooDeep { action_type, limit }));
            }
        }

        tracing::debug!(depth, "Processing action");

        let pending = {
            let _guard = self
                .inner
                .dispatch_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            let start = Instant::now();
            self.inner.host.commit(action);
            ReducerMetrics::record_dispatch(start.elapsed());

            std::mem::take(&mut *self.inner.queue.lock().unwrap_or_else(PoisonError::into_inner))
        };

        // Listeners may dispatch themselves
        self.inner.host.notify();

        tracing::trace!(commands = pending.len(), "Reducer completed");
        self.drain(pending, depth)
    }

    /// Execute queued commands and re-dispatch what they produce
    fn drain(&self, pending: Vec<PendingCmd<A>>, depth: usize) -> DispatchHandle {
        let ctx = self.context(depth + 1);
        let mut running: Vec<BoxFuture<'static, Result<(), LoopError>>> = Vec::new();

        for PendingCmd { action_type, cmd } in pending {
            if cmd.is_none() {
                continue;
            }
            CommandMetrics::record_execution(cmd.kind());

            match execute(cmd, &ctx) {
                Ok(None) => {},
                Ok(Some(actions)) => running.push(self.feed_back(action_type, actions, depth + 1)),
                Err(error) => running.push(future::ready(Err(attribute(&action_type, error))).boxed()),
            }
        }

        match running.len() {
            0 => DispatchHandle::ready(Ok(())),
            _ => DispatchHandle::spawn(
                async move { future::join_all(running).await.into_iter().collect() }.boxed(),
            ),
        }
    }

    /// Await a command's actions and dispatch each of them
    fn feed_back(
        &self,
        action_type: String,
        actions: ActionsFuture<A>,
        depth: usize,
    ) -> BoxFuture<'static, Result<(), LoopError>> {
        let store = self.clone();
        async move {
            let actions = actions.await.map_err(|error| attribute(&action_type, error))?;
            if actions.is_empty() {
                return Ok(());
            }
            tracing::trace!(count = actions.len(), "Command produced actions, dispatching");

            let handles: Vec<DispatchHandle> = actions
                .into_iter()
                .map(|action| store.dispatch_at(action, depth))
                .collect();
            future::join_all(handles).await.into_iter().collect()
        }
        .boxed()
    }

    /// Dependencies injected into commands, dispatching at `depth`
    fn context(&self, depth: usize) -> Context<A> {
        let dispatcher = self.clone();
        let reader = self.clone();
        Context::new(
            Dispatch::new(move |action| dispatcher.dispatch_at(action, depth).boxed()),
            GetState::new(move || reader.get_state()),
        )
        .with_log_handled_failures(self.inner.config.log_handled_failures)
    }
}

/// Attribute an unhandled failure to the action whose command raised it
///
/// Errors coming back from nested dispatches were reported there already.
fn attribute(action_type: &str, error: LoopError) -> LoopError {
    if error.is_attributed() {
        return error;
    }

    tracing::error!(
        action_type = %action_type,
        error = %error,
        "Unhandled failure in a command emitted for action `{action_type}`"
    );
    CommandMetrics::record_failure();
    LoopError::CommandFailed {
        action_type: action_type.to_string(),
        source: Box::new(error),
    }
}

/// Wrap a `Loop`-returning reducer into a plain host reducer that queues commands
fn lift<S, A, E, R>(reducer: Arc<R>, environment: Arc<E>, queue: Queue<A>) -> HostReducer<S, A>
where
    A: Action,
    E: Send + Sync + 'static,
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
{
    Box::new(move |state: &S, action: A| {
        let action_type = action.action_type().to_string();
        let (model, cmd) = reducer.reduce(state, action, &environment).into_parts();
        queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PendingCmd { action_type, cmd });
        model
    })
}

impl<S, A, E, R, H> Clone for Store<S, A, E, R, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _reducer: PhantomData,
        }
    }
}

impl<S, A, E, R, H> fmt::Debug for Store<S, A, E, R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
