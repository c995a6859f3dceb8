//! # Counter Demo
//!
//! A counter demonstrating the Reloop architecture.
//!
//! This demo showcases:
//! - A reducer returning `Loop` pairs
//! - Delayed effects described with `Cmd::run_async`
//! - Batched command lists
//! - Reading the live state from inside a command
//!
//! ## Example
//!
//! ```no_run
//! use counter::{CounterAction, CounterEnvironment, CounterReducer, CounterState};
//! use reloop_runtime::Store;
//!
//! # async fn example() {
//! let store = Store::new(CounterState::default(), CounterReducer, CounterEnvironment::default());
//!
//! store.dispatch(CounterAction::Increment).await.unwrap();
//! assert_eq!(store.get_state().count, 1);
//! # }
//! ```

use reloop_core::{Action, Arg, Cmd, Loop, Outcome, Reducer};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Counter state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterState {
    /// Current count value
    pub count: i64,
    /// Delayed increments not yet applied
    pub pending: u32,
}

/// Counter actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterAction {
    /// Increment the counter by 1
    Increment,
    /// Decrement the counter by 1
    Decrement,
    /// Reset the counter to 0
    Reset,
    /// Increment the counter by 1 after the environment's delay
    IncrementLater,
    /// A delayed increment fired
    DelayedIncrement,
    /// Increment `n` times through one batched command
    Burst(u32),
    /// Record the current count through the environment's sink
    Save,
}

impl Action for CounterAction {
    fn action_type(&self) -> &str {
        match self {
            Self::Increment => "INCREMENT",
            Self::Decrement => "DECREMENT",
            Self::Reset => "RESET",
            Self::IncrementLater => "INCREMENT_LATER",
            Self::DelayedIncrement => "DELAYED_INCREMENT",
            Self::Burst(_) => "BURST",
            Self::Save => "SAVE",
        }
    }
}

/// Counter environment
///
/// Holds what the commands need: how long delayed increments wait, and where
/// saved counts go.
#[derive(Debug, Clone, Default)]
pub struct CounterEnvironment {
    /// Delay applied by [`CounterAction::IncrementLater`]
    pub delay: Duration,
    /// Counts recorded by [`CounterAction::Save`]
    pub saved: Arc<Mutex<Vec<i64>>>,
}

impl CounterEnvironment {
    /// Create an environment with the given delay
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            saved: Arc::default(),
        }
    }

    /// Counts recorded so far
    #[must_use]
    pub fn saved(&self) -> Vec<i64> {
        self.saved.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Counter reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;
    type Environment = CounterEnvironment;

    fn reduce(
        &self,
        state: &Self::State,
        action: Self::Action,
        environment: &Self::Environment,
    ) -> Loop<Self::State, Self::Action> {
        match action {
            CounterAction::Increment => CounterState {
                count: state.count.saturating_add(1),
                ..state.clone()
            }
            .into(),
            CounterAction::Decrement => CounterState {
                count: state.count.saturating_sub(1),
                ..state.clone()
            }
            .into(),
            CounterAction::Reset => CounterState {
                count: 0,
                ..state.clone()
            }
            .into(),
            CounterAction::IncrementLater => {
                let delay = environment.delay;
                Loop::new(
                    CounterState {
                        pending: state.pending + 1,
                        ..state.clone()
                    },
                    Cmd::run_async(move |_| async move {
                        tokio::time::sleep(delay).await;
                        Ok(())
                    })
                    .on_success(|()| Some(CounterAction::DelayedIncrement))
                    .into(),
                )
            },
            CounterAction::DelayedIncrement => CounterState {
                count: state.count.saturating_add(1),
                pending: state.pending.saturating_sub(1),
            }
            .into(),
            CounterAction::Burst(n) => Loop::new(
                state.clone(),
                Cmd::batch((0..n).map(|_| Cmd::action(CounterAction::Increment)).collect()),
            ),
            CounterAction::Save => {
                let saved = Arc::clone(&environment.saved);
                Loop::new(
                    state.clone(),
                    Cmd::run(move |args| {
                        Outcome::from_result(args.get_state(0).map(|get_state| {
                            if let Some(current) = get_state.get::<CounterState>() {
                                saved
                                    .lock()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .push(current.count);
                            }
                        }))
                    })
                    .arg(Arg::GetState)
                    .into(),
                )
            },
        }
    }
}
