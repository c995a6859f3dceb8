//! Effect-free simulation of commands
//!
//! [`simulate`] computes what a command *would* yield if its functions
//! produced the given stand-in results. Nothing is invoked and nothing is
//! awaited, which makes it suitable for plain `#[test]` reducer tests.
//!
//! The [`Simulation`] tree mirrors the command: one node per `Run`, a
//! [`Simulation::List`] per `List`, and `Map` passes its node straight to the
//! command it wraps. `None` and `Action` commands ignore their node.

use crate::action::Action;
use crate::cmd::{Cmd, Creator};
use crate::error::SimulationError;
use std::any::{Any, type_name};
use std::fmt;

/// Stand-in result for a command
pub enum Simulation {
    /// The function succeeded with this value
    Success(Box<dyn Any + Send>),
    /// The function failed with this error
    Failure(anyhow::Error),
    /// One simulation per child of a list command, in declaration order
    List(Vec<Simulation>),
    /// Placeholder for commands that do not consume a result
    ///
    /// For a force-sync `Run` it stands for work still pending when the
    /// command ran.
    Ignored,
}

impl Simulation {
    /// Successful result
    pub fn success<T: Any + Send>(value: T) -> Self {
        Self::Success(Box::new(value))
    }

    /// Failed result
    pub fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    /// Results for the children of a list command
    pub fn list(items: impl IntoIterator<Item = Self>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Name of this node's shape, for error messages
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
            Self::List(_) => "list",
            Self::Ignored => "ignored",
        }
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(_) => f.write_str("Simulation::Success(..)"),
            Self::Failure(error) => write!(f, "Simulation::Failure({error})"),
            Self::List(items) => f.debug_tuple("Simulation::List").field(items).finish(),
            Self::Ignored => f.write_str("Simulation::Ignored"),
        }
    }
}

/// What a simulated command yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Simulated<A> {
    /// No action
    Nothing,
    /// A single action (from `Action`, `Run` or a `Map` of those)
    Action(A),
    /// The flattened actions of a list, in declaration order
    Actions(Vec<A>),
}

impl<A> Simulated<A> {
    /// All yielded actions
    #[must_use]
    pub fn into_vec(self) -> Vec<A> {
        match self {
            Self::Nothing => Vec::new(),
            Self::Action(action) => vec![action],
            Self::Actions(actions) => actions,
        }
    }

    /// Whether nothing is yielded
    #[must_use]
    pub const fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// Apply `f` to every yielded action, keeping the shape
    pub fn map<B>(self, f: impl Fn(A) -> B) -> Simulated<B> {
        match self {
            Self::Nothing => Simulated::Nothing,
            Self::Action(action) => Simulated::Action(f(action)),
            Self::Actions(actions) => Simulated::Actions(actions.into_iter().map(f).collect()),
        }
    }
}

/// Compute what `cmd` would yield given `simulation`
///
/// # Errors
///
/// Returns a [`SimulationError`] when `simulation` does not mirror the shape
/// of `cmd`, or when a success value is not of the type the `Run` command's
/// success creator accepts.
///
/// # Example
///
/// ```
/// use reloop_core::cmd::{Cmd, Outcome};
/// use reloop_core::simulate::{Simulated, Simulation, simulate};
///
/// let cmd: Cmd<String> = Cmd::run(|_| Outcome::ready(7_u32))
///     .on_success(|n| Some(format!("GOT_{n}")))
///     .into();
///
/// let result = simulate(&cmd, Simulation::success(7_u32)).unwrap();
/// assert_eq!(result, Simulated::Action("GOT_7".to_string()));
/// ```
pub fn simulate<A: Action>(cmd: &Cmd<A>, simulation: Simulation) -> Result<Simulated<A>, SimulationError> {
    match cmd {
        Cmd::None => Ok(Simulated::Nothing),
        Cmd::Action(action) => Ok(Simulated::Action(action.clone())),
        // A force-sync run whose work is still pending yields nothing
        Cmd::Run(run) if run.force_sync && matches!(simulation, Simulation::Ignored) => {
            Ok(Simulated::Nothing)
        },
        Cmd::Run(run) => Ok(run
            .effect
            .simulate(simulation)?
            .map_or(Simulated::Nothing, Simulated::Action)),
        Cmd::List(list) => {
            let items = match simulation {
                Simulation::List(items) => items,
                other => {
                    return Err(SimulationError::Shape {
                        command: "list",
                        simulation: other.shape(),
                    });
                },
            };
            if items.len() != list.cmds.len() {
                return Err(SimulationError::ListLength {
                    expected: list.cmds.len(),
                    found: items.len(),
                });
            }

            let mut actions = Vec::new();
            for (child, item) in list.cmds.iter().zip(items) {
                actions.extend(simulate(child, item)?.into_vec());
            }
            Ok(Simulated::Actions(actions))
        },
        Cmd::Map(map) => map.inner.simulate(simulation),
    }
}

/// Apply a `Run` command's creators to a stand-in result
pub(crate) fn simulate_run<A, T: Any>(
    on_success: Option<&Creator<T, A>>,
    on_fail: Option<&Creator<anyhow::Error, A>>,
    simulation: Simulation,
) -> Result<Option<A>, SimulationError> {
    if on_success.is_none() && on_fail.is_none() {
        return Ok(None);
    }

    match simulation {
        Simulation::Success(value) => {
            let Some(create) = on_success else {
                return Ok(None);
            };
            let value = value.downcast::<T>().map_err(|_| SimulationError::ResultType {
                expected: type_name::<T>(),
            })?;
            Ok(create(*value))
        },
        Simulation::Failure(error) => Ok(on_fail.and_then(|create| create(error))),
        other => Err(SimulationError::Shape {
            command: "run",
            simulation: other.shape(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::cmd::Outcome;

    #[derive(Clone, Debug, PartialEq)]
    enum Msg {
        Ok(i32),
        Err(String),
        Text(&'static str),
        Tagged(&'static str, Box<Msg>),
    }

    impl Action for Msg {
        fn action_type(&self) -> &str {
            match self {
                Self::Ok(_) => "OK",
                Self::Err(_) => "ERR",
                Self::Text(_) => "TEXT",
                Self::Tagged(..) => "TAGGED",
            }
        }
    }

    fn with_success() -> Cmd<Msg> {
        Cmd::run(|_| Outcome::ready(0)).on_success(|n| Some(Msg::Ok(n))).build()
    }

    fn with_fail() -> Cmd<Msg> {
        Cmd::run(|_| Outcome::ready(0))
            .on_fail(|e| Some(Msg::Err(e.to_string())))
            .build()
    }

    fn with_both() -> Cmd<Msg> {
        Cmd::run(|_| Outcome::ready(0))
            .on_success(|n| Some(Msg::Ok(n)))
            .on_fail(|e| Some(Msg::Err(e.to_string())))
            .build()
    }

    #[test]
    fn test_run_without_handlers_yields_nothing() {
        let cmd: Cmd<Msg> = Cmd::run(|_| Outcome::ready(0)).build();
        assert!(simulate(&cmd, Simulation::success(123)).unwrap().is_nothing());
        assert!(simulate(&cmd, Simulation::Ignored).unwrap().is_nothing());
    }

    #[test]
    fn test_run_selects_creator() {
        assert_eq!(
            simulate(&with_both(), Simulation::success(123)).unwrap(),
            Simulated::Action(Msg::Ok(123))
        );
        assert_eq!(
            simulate(&with_both(), Simulation::failure(anyhow::anyhow!("nope"))).unwrap(),
            Simulated::Action(Msg::Err("nope".to_string()))
        );
        assert!(simulate(&with_fail(), Simulation::success(123)).unwrap().is_nothing());
        assert!(
            simulate(&with_success(), Simulation::failure(anyhow::anyhow!("x")))
                .unwrap()
                .is_nothing()
        );
    }

    #[test]
    fn test_force_sync_run_settled_or_still_pending() {
        let cmd: Cmd<Msg> = Cmd::run_async(|_| async { Ok(3) })
            .on_success(|n| Some(Msg::Ok(n)))
            .force_sync()
            .build();

        assert_eq!(
            simulate(&cmd, Simulation::success(3)).unwrap(),
            Simulated::Action(Msg::Ok(3))
        );
        assert!(simulate(&cmd, Simulation::Ignored).unwrap().is_nothing());
    }

    #[test]
    fn test_action_and_none() {
        let action = Cmd::action(Msg::Text("hello"));
        assert_eq!(
            simulate(&action, Simulation::Ignored).unwrap(),
            Simulated::Action(Msg::Text("hello"))
        );
        assert!(simulate(&Cmd::<Msg>::none(), Simulation::success(1)).unwrap().is_nothing());
    }

    #[test]
    fn test_list_flattens_nested_results_and_skips_nothing() {
        let cmd = Cmd::list(vec![
            with_success(),
            Cmd::action(Msg::Text("hello")),
            Cmd::list(vec![with_fail(), Cmd::run(|_| Outcome::ready(())).build()]),
        ]);

        let result = simulate(
            &cmd,
            Simulation::list([
                Simulation::success(123),
                Simulation::Ignored,
                Simulation::list([
                    Simulation::failure(anyhow::anyhow!("456")),
                    Simulation::failure(anyhow::anyhow!("ignored")),
                ]),
            ]),
        )
        .unwrap();

        assert_eq!(
            result,
            Simulated::Actions(vec![
                Msg::Ok(123),
                Msg::Text("hello"),
                Msg::Err("456".to_string()),
            ])
        );
    }

    #[test]
    fn test_map_tags_single_and_list_results() {
        let tag = |a| Msg::Tagged("child", Box::new(a));

        let single = Cmd::map(with_success(), tag);
        assert_eq!(
            simulate(&single, Simulation::success(1)).unwrap(),
            Simulated::Action(Msg::Tagged("child", Box::new(Msg::Ok(1))))
        );

        let list = Cmd::map_with(
            Cmd::list(vec![with_success(), with_fail()]),
            |name: &&'static str, a| Msg::Tagged(name, Box::new(a)),
            "p1",
        );
        let result = simulate(
            &list,
            Simulation::list([
                Simulation::success(1),
                Simulation::failure(anyhow::anyhow!("2")),
            ]),
        )
        .unwrap();
        assert_eq!(
            result.into_vec(),
            vec![
                Msg::Tagged("p1", Box::new(Msg::Ok(1))),
                Msg::Tagged("p1", Box::new(Msg::Err("2".to_string()))),
            ]
        );

        let nothing = Cmd::map(Cmd::run(|_| Outcome::ready(0)).build(), tag);
        assert!(simulate(&nothing, Simulation::success(1)).unwrap().is_nothing());
    }

    #[test]
    fn test_shape_errors() {
        let list = Cmd::list(vec![with_success()]);
        assert_eq!(
            simulate(&list, Simulation::success(1)).unwrap_err(),
            SimulationError::Shape {
                command: "list",
                simulation: "success",
            }
        );
        assert_eq!(
            simulate(&list, Simulation::list([])).unwrap_err(),
            SimulationError::ListLength {
                expected: 1,
                found: 0,
            }
        );
        assert_eq!(
            simulate(&with_both(), Simulation::Ignored).unwrap_err(),
            SimulationError::Shape {
                command: "run",
                simulation: "ignored",
            }
        );
        assert!(matches!(
            simulate(&with_success(), Simulation::success("not an i32")).unwrap_err(),
            SimulationError::ResultType { .. }
        ));
    }
}
