//! Error types for command execution and simulation
//!
//! Failures of user-supplied effect functions are `anyhow::Error`s. They only
//! become a [`LoopError`] when no fail creator handles them.

use thiserror::Error;

/// Boxed error carried by [`LoopError::Unhandled`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the interpreter and the dispatch loop
#[derive(Error, Debug)]
pub enum LoopError {
    /// A `Run` function failed (synchronously or asynchronously) and no fail
    /// creator was registered for it.
    #[error("Unhandled command failure: {source}")]
    Unhandled {
        /// The failure returned by the effect function
        #[source]
        source: BoxError,
    },

    /// A command emitted while reducing `action_type` failed.
    ///
    /// The dispatch loop wraps an unhandled failure exactly once, at the drain
    /// that executed the failing command. Enclosing drains pass it through.
    #[error("Command emitted for action `{action_type}` failed: {source}")]
    CommandFailed {
        /// Type of the action whose reducer call produced the failing command
        action_type: String,
        /// The underlying failure
        #[source]
        source: Box<LoopError>,
    },

    /// Re-dispatching derived actions went deeper than the configured limit.
    #[error("Dispatch cascade exceeded depth {limit} at action `{action_type}`")]
    CascadeTooDeep {
        /// Type of the action that would have exceeded the limit
        action_type: String,
        /// Configured maximum depth
        limit: usize,
    },

    /// The task driving a dispatch panicked or was aborted.
    #[error("Dispatch task failed: {0}")]
    TaskFailed(String),
}

impl LoopError {
    /// Wrap an effect failure that no fail creator handled
    #[must_use]
    pub fn unhandled(error: anyhow::Error) -> Self {
        Self::Unhandled {
            source: error.into(),
        }
    }

    /// Whether the dispatch loop has already reported this error
    ///
    /// Only [`LoopError::Unhandled`] still needs to be attributed to the action
    /// whose command raised it.
    #[must_use]
    pub const fn is_attributed(&self) -> bool {
        !matches!(self, Self::Unhandled { .. })
    }

    /// The innermost unhandled effect failure, if this error carries one
    #[must_use]
    pub fn effect_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Unhandled { source } => Some(source.as_ref()),
            Self::CommandFailed { source, .. } => source.effect_error(),
            Self::CascadeTooDeep { .. } | Self::TaskFailed(_) => None,
        }
    }
}

/// Errors from [`simulate`](crate::simulate::simulate)
///
/// A simulation tree must mirror the shape of the command it is applied to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// The simulation node has the wrong shape for the command
    #[error("Cannot simulate a {command} command with a {simulation} simulation")]
    Shape {
        /// Kind of command being simulated
        command: &'static str,
        /// Shape of the simulation that was supplied
        simulation: &'static str,
    },

    /// A list simulation has a different number of entries than the list has children
    #[error("List command has {expected} children but {found} simulations were supplied")]
    ListLength {
        /// Number of children in the list command
        expected: usize,
        /// Number of simulations supplied
        found: usize,
    },

    /// A success simulation carries a value of the wrong type
    #[error("Success simulation does not hold a value of type `{expected}`")]
    ResultType {
        /// Type the run command's success creator expects
        expected: &'static str,
    },
}
