//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use reloop_core::{Action, Cmd, Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for command assertion functions
type CmdAssertion<A> = Box<dyn FnOnce(&Cmd<A>)>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use reloop_testing::{ReducerTest, assertions};
///
/// ReducerTest::new(CounterReducer)
///     .with_env(())
///     .given_state(CounterState { count: 0 })
///     .when_action(CounterAction::Increment)
///     .then_state(|state| {
///         assert_eq!(state.count, 1);
///     })
///     .then_cmd(assertions::assert_no_cmd)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    action: Option<A>,
    state_assertions: Vec<StateAssertion<S>>,
    cmd_assertions: Vec<CmdAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
    A: Action,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            action: None,
            state_assertions: Vec::new(),
            cmd_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting command (Then)
    #[must_use]
    pub fn then_cmd<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&Cmd<A>) + 'static,
    {
        self.cmd_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let action = self.action.expect("Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        // Execute reducer
        let (state, cmd) = self.reducer.reduce(&state, action, &env).into_parts();

        // Run state assertions
        for assertion in self.state_assertions {
            assertion(&state);
        }

        // Run command assertions
        for assertion in self.cmd_assertions {
            assertion(&cmd);
        }
    }
}

/// Helper assertions for commands
pub mod assertions {
    use reloop_core::simulate::{Simulation, simulate};
    use reloop_core::{Action, Cmd, CmdKind};
    use std::fmt::Debug;

    /// Assert that there is no command
    ///
    /// # Panics
    ///
    /// Panics if `cmd` is anything but `Cmd::None`.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_cmd<A: Action>(cmd: &Cmd<A>) {
        assert!(cmd.is_none(), "Expected no command, but found {cmd:?}");
    }

    /// Assert the kind of a command
    ///
    /// # Panics
    ///
    /// Panics if the kind doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_cmd_kind<A: Action>(cmd: &Cmd<A>, expected: CmdKind) {
        assert_eq!(
            cmd.kind(),
            expected,
            "Expected a {expected} command, but found {cmd:?}"
        );
    }

    /// Assert that `cmd` yields exactly `expected`, in order, under `simulation`
    ///
    /// # Panics
    ///
    /// Panics if the simulation is rejected or yields other actions.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_simulates_to<A>(cmd: &Cmd<A>, simulation: Simulation, expected: &[A])
    where
        A: Action + PartialEq + Debug,
    {
        match simulate(cmd, simulation) {
            Ok(simulated) => assert_eq!(simulated.into_vec(), expected),
            Err(error) => panic!("Simulation of {cmd:?} was rejected: {error}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use reloop_core::simulate::Simulation;
    use reloop_core::{CmdKind, Loop, Outcome};

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        Decrement,
        Fetch,
        Fetched(i32),
    }

    impl Action for TestAction {
        fn action_type(&self) -> &str {
            match self {
                Self::Increment => "INCREMENT",
                Self::Decrement => "DECREMENT",
                Self::Fetch => "FETCH",
                Self::Fetched(_) => "FETCHED",
            }
        }
    }

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> Loop<Self::State, Self::Action> {
            match action {
                TestAction::Increment => TestState {
                    count: state.count + 1,
                }
                .into(),
                TestAction::Decrement => TestState {
                    count: state.count - 1,
                }
                .into(),
                TestAction::Fetch => Loop::new(
                    state.clone(),
                    Cmd::run(|_| Outcome::ready(7))
                        .on_success(|n| Some(TestAction::Fetched(n)))
                        .into(),
                ),
                TestAction::Fetched(n) => TestState { count: n }.into(),
            }
        }
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .then_cmd(assertions::assert_no_cmd)
            .run();
    }

    #[test]
    fn test_reducer_test_decrement() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 5 })
            .when_action(TestAction::Decrement)
            .then_state(|state| {
                assert_eq!(state.count, 4);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_command() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 5 })
            .when_action(TestAction::Fetch)
            .then_state(|state| {
                assert_eq!(state.count, 5);
            })
            .then_cmd(|cmd| {
                assertions::assert_cmd_kind(cmd, CmdKind::Run);
                assertions::assert_simulates_to(
                    cmd,
                    Simulation::success(3),
                    &[TestAction::Fetched(3)],
                );
            })
            .run();
    }

    #[test]
    #[should_panic(expected = "Expected no command")]
    fn test_assert_no_cmd_rejects_commands() {
        assertions::assert_no_cmd(&Cmd::action(TestAction::Increment));
    }

    #[test]
    #[should_panic(expected = "was rejected")]
    fn test_assert_simulates_to_reports_shape_mismatch() {
        let cmd = Cmd::list(vec![Cmd::action(TestAction::Increment)]);
        assertions::assert_simulates_to(&cmd, Simulation::Ignored, &[TestAction::Increment]);
    }
}
