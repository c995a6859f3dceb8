//! Command descriptors
//!
//! A [`Cmd`] describes side effects without performing them. Reducers return
//! commands next to their new model; the interpreter runs them later.
//!
//! ```
//! use reloop_core::cmd::{Cmd, Outcome};
//! use reloop_core::context::Arg;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Msg {
//!     Loaded(u64),
//!     Failed(String),
//! }
//!
//! impl reloop_core::Action for Msg {
//!     fn action_type(&self) -> &str {
//!         match self {
//!             Msg::Loaded(_) => "LOADED",
//!             Msg::Failed(_) => "FAILED",
//!         }
//!     }
//! }
//!
//! let cmd: Cmd<Msg> = Cmd::run(|args| Outcome::from_result(args.value::<u64>(0)))
//!     .args([Arg::value(42)])
//!     .on_success(|n| Some(Msg::Loaded(n)))
//!     .on_fail(|e| Some(Msg::Failed(e.to_string())))
//!     .into();
//!
//! assert_eq!(cmd.kind().as_str(), "run");
//! ```

use crate::action::Action;
use crate::context::{Arg, Args, Context, Tagger};
use crate::error::SimulationError;
use crate::interpreter::{self, Execution};
use crate::simulate::{self, Simulated, Simulation};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Result of invoking a `Run` function
///
/// `Ready` is a synchronous return (or synchronous failure); `Pending` is
/// asynchronous work the interpreter awaits before consulting the creators.
pub enum Outcome<T> {
    /// The function finished synchronously
    Ready(anyhow::Result<T>),
    /// The function started asynchronous work
    Pending(BoxFuture<'static, anyhow::Result<T>>),
}

impl<T> Outcome<T> {
    /// Synchronous success
    pub const fn ready(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    /// Synchronous failure
    pub fn fail(error: impl Into<anyhow::Error>) -> Self {
        Self::Ready(Err(error.into()))
    }

    /// Synchronous result
    pub fn from_result<E: Into<anyhow::Error>>(result: Result<T, E>) -> Self {
        Self::Ready(result.map_err(Into::into))
    }

    /// Asynchronous work
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self::Pending(future.boxed())
    }

    /// Whether the function returned asynchronous work
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl<T> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(Ok(_)) => f.write_str("Outcome::Ready(Ok(..))"),
            Self::Ready(Err(error)) => write!(f, "Outcome::Ready(Err({error}))"),
            Self::Pending(_) => f.write_str("Outcome::Pending(<future>)"),
        }
    }
}

pub(crate) type RunFn<A, T> = Box<dyn FnOnce(Args<A>) -> Outcome<T> + Send>;
pub(crate) type Creator<I, A> = Box<dyn Fn(I) -> Option<A> + Send + Sync>;

/// Type-erased body of a `Run` command
///
/// Keeps the result type `T` of the function hidden so that `Cmd<A>` only
/// depends on the action type.
pub(crate) trait RunEffect<A>: Send {
    fn invoke(self: Box<Self>, args: Args<A>, force_sync: bool, log_handled: bool)
    -> Execution<A>;

    fn simulate(&self, simulation: Simulation) -> Result<Option<A>, SimulationError>;

    fn has_success_creator(&self) -> bool;

    fn has_fail_creator(&self) -> bool;
}

struct RunDescription<A, T> {
    func: RunFn<A, T>,
    on_success: Option<Creator<T, A>>,
    on_fail: Option<Creator<anyhow::Error, A>>,
}

impl<A, T> RunEffect<A> for RunDescription<A, T>
where
    A: Action,
    T: Send + 'static,
{
    fn invoke(
        self: Box<Self>,
        args: Args<A>,
        force_sync: bool,
        log_handled: bool,
    ) -> Execution<A> {
        let Self {
            func,
            on_success,
            on_fail,
        } = *self;
        interpreter::invoke_run(func(args), on_success, on_fail, force_sync, log_handled)
    }

    fn simulate(&self, simulation: Simulation) -> Result<Option<A>, SimulationError> {
        simulate::simulate_run(self.on_success.as_ref(), self.on_fail.as_ref(), simulation)
    }

    fn has_success_creator(&self) -> bool {
        self.on_success.is_some()
    }

    fn has_fail_creator(&self) -> bool {
        self.on_fail.is_some()
    }
}

/// "Invoke this function and map its result to an action"
pub struct Run<A> {
    pub(crate) effect: Box<dyn RunEffect<A>>,
    pub(crate) args: Vec<Arg>,
    pub(crate) force_sync: bool,
}

impl<A> Run<A> {
    /// Arguments as written by the reducer, sentinels included
    #[must_use]
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Whether a success creator is registered
    #[must_use]
    pub fn has_success_creator(&self) -> bool {
        self.effect.has_success_creator()
    }

    /// Whether a fail creator is registered
    #[must_use]
    pub fn has_fail_creator(&self) -> bool {
        self.effect.has_fail_creator()
    }

    /// Whether the function's result is used without awaiting it
    #[must_use]
    pub const fn is_force_sync(&self) -> bool {
        self.force_sync
    }
}

/// Builder returned by [`Cmd::run`]
#[must_use = "a run builder does nothing until it is turned into a Cmd"]
pub struct RunBuilder<A, T> {
    func: RunFn<A, T>,
    args: Vec<Arg>,
    on_success: Option<Creator<T, A>>,
    on_fail: Option<Creator<anyhow::Error, A>>,
    force_sync: bool,
}

impl<A, T> RunBuilder<A, T>
where
    A: Action,
    T: Send + 'static,
{
    /// Set the argument list
    pub fn args(mut self, args: impl IntoIterator<Item = Arg>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Map a successful result to an action; `None` emits nothing
    pub fn on_success<F>(mut self, creator: F) -> Self
    where
        F: Fn(T) -> Option<A> + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(creator));
        self
    }

    /// Map a failure to an action; `None` emits nothing
    ///
    /// Without a fail creator, failures propagate to the dispatch caller.
    pub fn on_fail<F>(mut self, creator: F) -> Self
    where
        F: Fn(anyhow::Error) -> Option<A> + Send + Sync + 'static,
    {
        self.on_fail = Some(Box::new(creator));
        self
    }

    /// Use the function's result without waiting for it
    ///
    /// Pending work that has already settled when first polled goes through
    /// the creators right away. Anything else runs detached and yields no action.
    pub const fn force_sync(mut self) -> Self {
        self.force_sync = true;
        self
    }

    /// Finish the command
    pub fn build(self) -> Cmd<A> {
        Cmd::Run(Run {
            effect: Box::new(RunDescription {
                func: self.func,
                on_success: self.on_success,
                on_fail: self.on_fail,
            }),
            args: self.args,
            force_sync: self.force_sync,
        })
    }
}

impl<A, T> From<RunBuilder<A, T>> for Cmd<A>
where
    A: Action,
    T: Send + 'static,
{
    fn from(builder: RunBuilder<A, T>) -> Self {
        builder.build()
    }
}

/// Execution options of a list command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Run children one after another instead of concurrently
    pub sequence: bool,
    /// Collect and return children's actions instead of dispatching them as they arrive
    pub batch: bool,
}

/// "Run these commands together"
pub struct List<A> {
    pub(crate) cmds: Vec<Cmd<A>>,
    pub(crate) options: ListOptions,
}

impl<A> List<A> {
    /// Child commands in declaration order
    #[must_use]
    pub fn cmds(&self) -> &[Cmd<A>] {
        &self.cmds
    }

    /// Execution options
    #[must_use]
    pub const fn options(&self) -> ListOptions {
        self.options
    }

    /// Whether children run one after another
    #[must_use]
    pub const fn is_sequence(&self) -> bool {
        self.options.sequence
    }

    /// Whether children's actions are collected and returned
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        self.options.batch
    }
}

/// Type-erased body of a `Map` command
pub(crate) trait MapEffect<A>: Send {
    fn execute(self: Box<Self>, ctx: &Context<A>) -> Execution<A>;

    fn simulate(&self, simulation: Simulation) -> Result<Simulated<A>, SimulationError>;

    fn nested_kind(&self) -> CmdKind;

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

struct Mapped<B, A> {
    nested: Cmd<B>,
    tagger: Tagger<B, A>,
}

impl<B, A> MapEffect<A> for Mapped<B, A>
where
    B: Action,
    A: Action,
{
    fn execute(self: Box<Self>, ctx: &Context<A>) -> Execution<A> {
        let Self { nested, tagger } = *self;
        interpreter::execute_mapped(nested, tagger, ctx)
    }

    fn simulate(&self, simulation: Simulation) -> Result<Simulated<A>, SimulationError> {
        Ok(simulate::simulate(&self.nested, simulation)?.map(&*self.tagger))
    }

    fn nested_kind(&self) -> CmdKind {
        self.nested.kind()
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.nested, f)
    }
}

/// "Tag every action the nested command yields"
pub struct Map<A> {
    pub(crate) inner: Box<dyn MapEffect<A>>,
}

impl<A> Map<A> {
    /// Kind of the wrapped command
    #[must_use]
    pub fn nested_kind(&self) -> CmdKind {
        self.inner.nested_kind()
    }
}

/// Discriminant of a [`Cmd`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmdKind {
    /// [`Cmd::None`]
    None,
    /// [`Cmd::Action`]
    Action,
    /// [`Cmd::Run`]
    Run,
    /// [`Cmd::List`]
    List,
    /// [`Cmd::Map`]
    Map,
}

impl CmdKind {
    /// Lowercase name, used for log fields and metric labels
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Action => "action",
            Self::Run => "run",
            Self::List => "list",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for CmdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command descriptor - describes a side effect to be executed
///
/// Commands are NOT executed when built. They are immutable descriptions,
/// returned from reducers and consumed exactly once by the interpreter (or
/// inspected by [`simulate`](crate::simulate::simulate) in tests).
///
/// # Type Parameters
///
/// - `A`: The action type the command yields (feedback loop)
pub enum Cmd<A> {
    /// No effect
    None,

    /// Yield one action immediately
    Action(A),

    /// Invoke a function and map its result to an action
    Run(Run<A>),

    /// Run several commands together
    List(List<A>),

    /// Run a nested command and tag its actions
    Map(Map<A>),
}

impl<A: Action> Cmd<A> {
    /// The command that does nothing
    #[must_use]
    pub const fn none() -> Self {
        Self::None
    }

    /// Yield `action` without any asynchronous work
    #[must_use]
    pub const fn action(action: A) -> Self {
        Self::Action(action)
    }

    /// Invoke `func` when the command is executed
    ///
    /// `func` receives the argument list with sentinels substituted. Finish the
    /// builder with `.into()` or [`RunBuilder::build`].
    pub fn run<T, F>(func: F) -> RunBuilder<A, T>
    where
        T: Send + 'static,
        F: FnOnce(Args<A>) -> Outcome<T> + Send + 'static,
    {
        RunBuilder {
            func: Box::new(func),
            args: Vec::new(),
            on_success: None,
            on_fail: None,
            force_sync: false,
        }
    }

    /// Invoke an async function when the command is executed
    pub fn run_async<T, F, Fut>(func: F) -> RunBuilder<A, T>
    where
        T: Send + 'static,
        F: FnOnce(Args<A>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self::run(move |args| Outcome::pending(func(args)))
    }

    /// Run `cmds` concurrently, dispatching each child's actions as they arrive
    #[must_use]
    pub fn list(cmds: Vec<Self>) -> Self {
        Self::list_with(cmds, ListOptions::default())
    }

    /// Run `cmds` with explicit ordering and batching
    #[must_use]
    pub fn list_with(cmds: Vec<Self>, options: ListOptions) -> Self {
        Self::List(List { cmds, options })
    }

    /// Run `cmds` concurrently and return all of their actions together
    #[must_use]
    pub fn batch(cmds: Vec<Self>) -> Self {
        Self::list_with(
            cmds,
            ListOptions {
                sequence: false,
                batch: true,
            },
        )
    }

    /// Run `cmds` one after another and return all of their actions together
    #[must_use]
    pub fn sequence(cmds: Vec<Self>) -> Self {
        Self::list_with(
            cmds,
            ListOptions {
                sequence: true,
                batch: true,
            },
        )
    }

    /// Pass every action `cmd` yields through `tagger`
    #[must_use]
    pub fn map<B, F>(cmd: Cmd<B>, tagger: F) -> Self
    where
        B: Action,
        F: Fn(B) -> A + Send + Sync + 'static,
    {
        Self::Map(Map {
            inner: Box::new(Mapped {
                nested: cmd,
                tagger: Arc::new(tagger),
            }),
        })
    }

    /// Like [`Cmd::map`], handing `extra` to the tagger ahead of each action
    #[must_use]
    pub fn map_with<B, X, F>(cmd: Cmd<B>, tagger: F, extra: X) -> Self
    where
        B: Action,
        X: Send + Sync + 'static,
        F: Fn(&X, B) -> A + Send + Sync + 'static,
    {
        Self::map(cmd, move |action| tagger(&extra, action))
    }

    /// Discriminant of this command
    #[must_use]
    pub const fn kind(&self) -> CmdKind {
        match self {
            Self::None => CmdKind::None,
            Self::Action(_) => CmdKind::Action,
            Self::Run(_) => CmdKind::Run,
            Self::List(_) => CmdKind::List,
            Self::Map(_) => CmdKind::Map,
        }
    }

    /// Whether this is [`Cmd::None`]
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The action of a [`Cmd::Action`]
    #[must_use]
    pub const fn as_action(&self) -> Option<&A> {
        match self {
            Self::Action(action) => Some(action),
            _ => None,
        }
    }

    /// The body of a [`Cmd::Run`]
    #[must_use]
    pub const fn as_run(&self) -> Option<&Run<A>> {
        match self {
            Self::Run(run) => Some(run),
            _ => None,
        }
    }

    /// The body of a [`Cmd::List`]
    #[must_use]
    pub const fn as_list(&self) -> Option<&List<A>> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }
}

impl<A> Default for Cmd<A> {
    fn default() -> Self {
        Self::None
    }
}

// Manual Debug implementation since closures don't implement Debug
impl<A: Action> fmt::Debug for Cmd<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "Cmd::None"),
            Self::Action(action) => f
                .debug_tuple("Cmd::Action")
                .field(&action.action_type())
                .finish(),
            Self::Run(run) => f
                .debug_struct("Cmd::Run")
                .field("args", &run.args)
                .field("success_creator", &run.has_success_creator())
                .field("fail_creator", &run.has_fail_creator())
                .field("force_sync", &run.force_sync)
                .finish_non_exhaustive(),
            Self::List(list) => f
                .debug_struct("Cmd::List")
                .field("sequence", &list.options.sequence)
                .field("batch", &list.options.batch)
                .field("cmds", &list.cmds)
                .finish(),
            Self::Map(map) => {
                f.write_str("Cmd::Map(<tagger>, ")?;
                map.inner.fmt_nested(f)?;
                f.write_str(")")
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Loaded(i32),
        Failed,
    }

    impl Action for TestAction {
        fn action_type(&self) -> &str {
            match self {
                Self::Loaded(_) => "LOADED",
                Self::Failed => "FAILED",
            }
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    enum ParentAction {
        Child(TestAction),
    }

    impl Action for ParentAction {
        fn action_type(&self) -> &str {
            "CHILD"
        }
    }

    #[test]
    fn test_run_builder_records_options() {
        let cmd: Cmd<TestAction> = Cmd::run(|_| Outcome::ready(1))
            .args([Arg::value(5), Arg::Dispatch])
            .on_success(|n| Some(TestAction::Loaded(n)))
            .force_sync()
            .into();

        let run = cmd.as_run().unwrap();
        assert_eq!(run.args(), &[Arg::value(5), Arg::Dispatch]);
        assert!(run.has_success_creator());
        assert!(!run.has_fail_creator());
        assert!(run.is_force_sync());
    }

    #[test]
    fn test_list_shorthands() {
        let batch = Cmd::<TestAction>::batch(vec![Cmd::none()]);
        let list = batch.as_list().unwrap();
        assert!(list.is_batch());
        assert!(!list.is_sequence());

        let sequence = Cmd::<TestAction>::sequence(vec![]);
        let list = sequence.as_list().unwrap();
        assert!(list.is_batch());
        assert!(list.is_sequence());

        let plain = Cmd::<TestAction>::list(vec![Cmd::none(), Cmd::none()]);
        assert_eq!(plain.as_list().unwrap().options(), ListOptions::default());
        assert_eq!(plain.as_list().unwrap().cmds().len(), 2);
    }

    #[test]
    fn test_single_child_list_is_not_collapsed() {
        let cmd = Cmd::list(vec![Cmd::action(TestAction::Failed)]);
        assert_eq!(cmd.kind(), CmdKind::List);
    }

    #[test]
    fn test_map_reports_nested_kind() {
        let cmd: Cmd<ParentAction> =
            Cmd::map(Cmd::action(TestAction::Failed), ParentAction::Child);

        match &cmd {
            Cmd::Map(map) => assert_eq!(map.nested_kind(), CmdKind::Action),
            other => panic!("expected a map, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_rendering() {
        let cmd = Cmd::list(vec![
            Cmd::action(TestAction::Loaded(1)),
            Cmd::run(|_| Outcome::ready(()))
                .on_fail(|_| Some(TestAction::Failed))
                .build(),
        ]);

        let rendered = format!("{cmd:?}");
        assert!(rendered.contains("Cmd::Action(\"LOADED\")"));
        assert!(rendered.contains("fail_creator: true"));

        let mapped: Cmd<ParentAction> = Cmd::map(Cmd::<TestAction>::none(), ParentAction::Child);
        assert_eq!(format!("{mapped:?}"), "Cmd::Map(<tagger>, Cmd::None)");
    }

    #[test]
    fn test_outcome_constructors() {
        assert!(!Outcome::ready(1).is_pending());
        assert!(Outcome::<i32>::pending(async { Ok(1) }).is_pending());
        assert!(matches!(
            Outcome::<i32>::from_result(Err(std::fmt::Error)),
            Outcome::Ready(Err(_))
        ));
        assert!(matches!(Outcome::<i32>::fail(std::fmt::Error), Outcome::Ready(Err(_))));
    }
}
