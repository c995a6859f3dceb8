//! # Reloop Core
//!
//! Command descriptors, their interpreter and simulator for the Reloop architecture.
//!
//! Reducers stay pure: instead of performing side effects they return a
//! [`Loop`] pairing their new model with a [`Cmd`] that *describes* the
//! effects. The runtime crate executes those descriptions and feeds the
//! resulting actions back into the reducer.
//!
//! ## Core Concepts
//!
//! - **Action**: Input to a reducer, identified by its [`Action::action_type`]
//! - **Reducer**: Pure function `(State, Action, Environment) → Loop<State, Action>`
//! - **Cmd**: Side effect description (not execution)
//! - **Interpreter**: [`execute`] turns a `Cmd` into effects and follow-up actions
//! - **Simulation**: [`simulate`](simulate::simulate) computes those actions from stand-in results
//!
//! ## Example
//!
//! ```ignore
//! use reloop_core::*;
//!
//! #[derive(Clone, Debug)]
//! enum UserAction {
//!     Load { id: u64 },
//!     Loaded(User),
//!     LoadFailed(String),
//! }
//!
//! impl Reducer for UserReducer {
//!     type State = UserState;
//!     type Action = UserAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &UserState, action: UserAction, _env: &()) -> Loop<UserState, UserAction> {
//!         match action {
//!             UserAction::Load { id } => Loop::new(
//!                 UserState { loading: true, ..state.clone() },
//!                 Cmd::run_async(|args| fetch_user(args.value::<u64>(0)))
//!                     .arg(Arg::value(id))
//!                     .on_success(|user| Some(UserAction::Loaded(user)))
//!                     .on_fail(|e| Some(UserAction::LoadFailed(e.to_string())))
//!                     .into(),
//!             ),
//!             UserAction::Loaded(user) => UserState { loading: false, user: Some(user) }.into(),
//!             UserAction::LoadFailed(_) => UserState { loading: false, ..state.clone() }.into(),
//!         }
//!     }
//! }
//! ```

pub mod cmd;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod loop_pair;
pub mod simulate;
pub mod util;

// Re-export commonly used types
pub use action::Action;
pub use cmd::{Cmd, CmdKind, ListOptions, Outcome};
pub use context::{Arg, Args, Context, Dispatch, GetState};
pub use error::{LoopError, SimulationError};
pub use interpreter::execute;
pub use loop_pair::{Loop, get_cmd, get_model, is_loop, lift_state};
pub use reducer::{FnReducer, Reducer, from_fn};
pub use util::{batch_cmds, flatten};

/// Action module - Inputs to reducers
///
/// Actions only need a type name, used for diagnostics and metrics labels.
/// Commands own their actions and may move them across tasks, hence the
/// `Clone + Send + 'static` bound.
pub mod action {
    /// An input to a reducer
    ///
    /// # Example
    ///
    /// ```
    /// use reloop_core::Action;
    ///
    /// #[derive(Clone, Debug)]
    /// enum CounterAction {
    ///     Increment,
    ///     Reset,
    /// }
    ///
    /// impl Action for CounterAction {
    ///     fn action_type(&self) -> &str {
    ///         match self {
    ///             CounterAction::Increment => "INCREMENT",
    ///             CounterAction::Reset => "RESET",
    ///         }
    ///     }
    /// }
    ///
    /// assert_eq!(CounterAction::Reset.action_type(), "RESET");
    /// ```
    pub trait Action: Clone + Send + 'static {
        /// Name of this action's type
        fn action_type(&self) -> &str;
    }

    impl Action for &'static str {
        fn action_type(&self) -> &str {
            self
        }
    }

    impl Action for String {
        fn action_type(&self) -> &str {
            self.as_str()
        }
    }
}

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → Loop<State, Action>`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use crate::loop_pair::Loop;
    use std::marker::PhantomData;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: Extra arguments handed to every call
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for CounterReducer {
    ///     type State = Counter;
    ///     type Action = CounterAction;
    ///     type Environment = ();
    ///
    ///     fn reduce(&self, state: &Counter, action: CounterAction, _env: &()) -> Loop<Counter, CounterAction> {
    ///         match action {
    ///             CounterAction::Increment => Counter { value: state.value + 1 }.into(),
    ///             CounterAction::IncrementLater => Loop::new(state.clone(), delayed_increment()),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// Extra arguments handed to every call
        type Environment;

        /// Reduce an action into a new state and a command
        ///
        /// # Arguments
        ///
        /// - `state`: Current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// The next state paired with the command to execute. A bare state
        /// converts into a pair with no command via `.into()`.
        fn reduce(
            &self,
            state: &Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Loop<Self::State, Self::Action>;
    }

    /// Reducer backed by a closure, see [`from_fn`]
    pub struct FnReducer<S, A, E, F> {
        f: F,
        _marker: PhantomData<fn(&S, A, &E)>,
    }

    /// Turn a closure into a [`Reducer`]
    pub const fn from_fn<S, A, E, F>(f: F) -> FnReducer<S, A, E, F>
    where
        F: Fn(&S, A, &E) -> Loop<S, A>,
    {
        FnReducer {
            f,
            _marker: PhantomData,
        }
    }

    impl<S, A, E, F> Reducer for FnReducer<S, A, E, F>
    where
        F: Fn(&S, A, &E) -> Loop<S, A>,
    {
        type State = S;
        type Action = A;
        type Environment = E;

        fn reduce(&self, state: &S, action: A, env: &E) -> Loop<S, A> {
            (self.f)(state, action, env)
        }
    }

    impl<R> Reducer for Box<R>
    where
        R: Reducer + ?Sized,
    {
        type State = R::State;
        type Action = R::Action;
        type Environment = R::Environment;

        fn reduce(
            &self,
            state: &Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Loop<Self::State, Self::Action> {
            (**self).reduce(state, action, env)
        }
    }

    impl<S, A, E, F> std::fmt::Debug for FnReducer<S, A, E, F> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("FnReducer(<fn>)")
        }
    }
}
