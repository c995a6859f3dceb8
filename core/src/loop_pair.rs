//! The `(model, command)` pair returned by reducers

use crate::action::Action;
use crate::cmd::Cmd;
use std::fmt;

/// A model paired with the command its reducer call emitted
///
/// A bare model converts into a `Loop` with [`Cmd::None`]:
///
/// ```
/// use reloop_core::{Loop, is_loop};
///
/// let lifted: Loop<u32, String> = 7.into();
/// assert_eq!(*lifted.model(), 7);
/// assert!(!is_loop(&lifted));
/// ```
pub struct Loop<S, A> {
    model: S,
    cmd: Cmd<A>,
}

impl<S, A: Action> Loop<S, A> {
    /// Pair `model` with `cmd`
    #[must_use]
    pub const fn new(model: S, cmd: Cmd<A>) -> Self {
        Self { model, cmd }
    }

    /// The new model
    #[must_use]
    pub const fn model(&self) -> &S {
        &self.model
    }

    /// The emitted command
    #[must_use]
    pub const fn cmd(&self) -> &Cmd<A> {
        &self.cmd
    }

    /// Split into model and command
    #[must_use]
    pub fn into_parts(self) -> (S, Cmd<A>) {
        (self.model, self.cmd)
    }

    /// Drop the command and keep the model
    #[must_use]
    pub fn into_model(self) -> S {
        self.model
    }
}

impl<S, A> From<S> for Loop<S, A> {
    fn from(model: S) -> Self {
        Self {
            model,
            cmd: Cmd::None,
        }
    }
}

impl<S: fmt::Debug, A: Action> fmt::Debug for Loop<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loop")
            .field("model", &self.model)
            .field("cmd", &self.cmd)
            .finish()
    }
}

/// Whether the pair carries a command other than [`Cmd::None`]
#[must_use]
pub const fn is_loop<S, A: Action>(pair: &Loop<S, A>) -> bool {
    !pair.cmd.is_none()
}

/// The model of a pair
#[must_use]
pub const fn get_model<S, A: Action>(pair: &Loop<S, A>) -> &S {
    &pair.model
}

/// The command of a pair, or `None` if it carries [`Cmd::None`]
#[must_use]
pub const fn get_cmd<S, A: Action>(pair: &Loop<S, A>) -> Option<&Cmd<A>> {
    if pair.cmd.is_none() { None } else { Some(&pair.cmd) }
}

/// Normalise a reducer result (bare model or pair) into a pair
///
/// A `Loop` argument also converts into a `Loop` whose model is that pair,
/// so name the result type when passing one.
#[must_use]
pub fn lift_state<S, A>(result: impl Into<Loop<S, A>>) -> Loop<S, A> {
    result.into()
}
