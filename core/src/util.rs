//! Helpers shared by reducers and the interpreter

use crate::action::Action;
use crate::cmd::Cmd;

/// Concatenate nested collections one level deep, preserving order
pub fn flatten<T, I>(nested: impl IntoIterator<Item = I>) -> Vec<T>
where
    I: IntoIterator<Item = T>,
{
    nested.into_iter().flatten().collect()
}

/// Merge the commands of several child reducers into one
///
/// No commands give [`Cmd::None`], a single command is returned as is and
/// anything more becomes a parallel [`Cmd::list`].
#[must_use]
pub fn batch_cmds<A: Action>(mut cmds: Vec<Cmd<A>>) -> Cmd<A> {
    match cmds.len() {
        0 => Cmd::None,
        1 => cmds.pop().unwrap_or_default(),
        _ => Cmd::list(cmds),
    }
}
