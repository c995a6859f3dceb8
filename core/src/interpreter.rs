//! Command interpreter
//!
//! [`execute`] walks a [`Cmd`] tree, invokes the functions it describes and
//! produces the actions that should be fed back into the reducer.
//!
//! # Return shape
//!
//! - `Err(..)`: a function failed synchronously and nothing handled it.
//! - `Ok(None)`: the command is known to yield nothing that needs dispatching.
//! - `Ok(Some(future))`: the actions, once every asynchronous part has settled.
//!
//! Everything that can start right away starts inside `execute`: `Run`
//! functions of parallel list children, the first child of a sequence and the
//! command wrapped by a `Map` are invoked before `execute` returns.

use crate::action::Action;
use crate::cmd::{Cmd, Creator, List, Map, Outcome, Run};
use crate::context::{Context, Dispatch, Tagger};
use crate::error::LoopError;
use crate::util::flatten;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use futures::task::noop_waker_ref;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tokio::runtime::Handle;
use tracing::{trace, warn};

/// Future resolving to the actions a command produced
pub type ActionsFuture<A> = BoxFuture<'static, Result<Vec<A>, LoopError>>;

/// Result of [`execute`]
pub type Execution<A> = Result<Option<ActionsFuture<A>>, LoopError>;

/// Execute a command against `ctx`
///
/// # Errors
///
/// Returns [`LoopError::Unhandled`] if a `Run` function reached during the
/// synchronous part of the walk fails and has no fail creator. Failures of
/// asynchronous work surface through the returned future instead.
pub fn execute<A: Action>(cmd: Cmd<A>, ctx: &Context<A>) -> Execution<A> {
    match cmd {
        Cmd::None => {
            trace!("Executing Cmd::None");
            Ok(None)
        },

        Cmd::Action(action) => {
            trace!(action_type = action.action_type(), "Executing Cmd::Action");
            Ok(Some(ready(vec![action])))
        },

        Cmd::Run(Run {
            effect,
            args,
            force_sync,
        }) => {
            trace!(args = args.len(), force_sync, "Executing Cmd::Run");
            let args = ctx.inject(args);
            effect.invoke(args, force_sync, ctx.log_handled_failures())
        },

        Cmd::List(List { cmds, options }) => {
            trace!(
                children = cmds.len(),
                sequence = options.sequence,
                batch = options.batch,
                "Executing Cmd::List"
            );
            if options.sequence {
                execute_sequence(cmds, options.batch, ctx.clone())
            } else {
                execute_parallel(cmds, options.batch, ctx)
            }
        },

        Cmd::Map(Map { inner }) => {
            trace!("Executing Cmd::Map");
            inner.execute(ctx)
        },
    }
}

/// Drive the result of a `Run` function through its creators
pub(crate) fn invoke_run<A, T>(
    outcome: Outcome<T>,
    on_success: Option<Creator<T, A>>,
    on_fail: Option<Creator<anyhow::Error, A>>,
    force_sync: bool,
    log_handled: bool,
) -> Execution<A>
where
    A: Action,
    T: Send + 'static,
{
    let result = match outcome {
        Outcome::Ready(result) => result,

        Outcome::Pending(work) if force_sync => match settle_now(work) {
            Ok(result) => result,
            Err(work) => {
                detach(work);
                return Ok(None);
            },
        },

        Outcome::Pending(work) => {
            return Ok(Some(
                async move {
                    let result = work.await;
                    let action = settle(result, on_success.as_ref(), on_fail.as_ref(), log_handled)?;
                    Ok(action.into_iter().collect())
                }
                .boxed(),
            ));
        },
    };

    let action = settle(result, on_success.as_ref(), on_fail.as_ref(), log_handled)?;
    Ok(action.map(|action| ready(vec![action])))
}

/// Execute the command wrapped by a `Map` and tag what it yields
pub(crate) fn execute_mapped<B, A>(nested: Cmd<B>, tagger: Tagger<B, A>, ctx: &Context<A>) -> Execution<A>
where
    B: Action,
    A: Action,
{
    let inner_ctx = ctx.map(Arc::clone(&tagger));
    let Some(actions) = execute(nested, &inner_ctx)? else {
        return Ok(None);
    };

    Ok(Some(
        async move {
            let actions = actions.await?;
            Ok(actions.into_iter().map(&*tagger).collect())
        }
        .boxed(),
    ))
}

fn ready<A: Send + 'static>(actions: Vec<A>) -> ActionsFuture<A> {
    future::ready(Ok(actions)).boxed()
}

fn settle<A, T>(
    result: anyhow::Result<T>,
    on_success: Option<&Creator<T, A>>,
    on_fail: Option<&Creator<anyhow::Error, A>>,
    log_handled: bool,
) -> Result<Option<A>, LoopError> {
    match result {
        Ok(value) => Ok(on_success.and_then(|create| create(value))),
        Err(error) => match on_fail {
            Some(create) => {
                if log_handled {
                    warn!(error = %error, "Command failure handled by fail creator");
                }
                Ok(create(error))
            },
            None => Err(LoopError::unhandled(error)),
        },
    }
}

/// Poll a force-sync command's work once, handing it back if it is not done
///
/// Polling needs a runtime context for tokio resources, so outside one the
/// work is handed back untouched.
fn settle_now<T>(
    mut work: BoxFuture<'static, anyhow::Result<T>>,
) -> Result<anyhow::Result<T>, BoxFuture<'static, anyhow::Result<T>>> {
    if Handle::try_current().is_err() {
        return Err(work);
    }
    let mut cx = TaskContext::from_waker(noop_waker_ref());
    match work.poll_unpin(&mut cx) {
        Poll::Ready(result) => Ok(result),
        Poll::Pending => Err(work),
    }
}

/// Let a force-sync command's pending work finish on its own
fn detach<T: Send + 'static>(work: BoxFuture<'static, anyhow::Result<T>>) {
    match Handle::try_current() {
        Ok(handle) => {
            drop(handle.spawn(async move {
                if let Err(error) = work.await {
                    warn!(error = %error, "Detached force_sync command failed");
                }
            }));
        },
        Err(_) => {
            warn!("force_sync command returned pending work outside a tokio runtime; dropping it");
        },
    }
}

/// Keep already started siblings of a synchronously failed child running
fn finish_detached<A: Send + 'static>(started: Vec<ActionsFuture<A>>) {
    if started.is_empty() {
        return;
    }
    if let Ok(handle) = Handle::try_current() {
        drop(handle.spawn(future::join_all(started)));
    }
}

/// Send every action through `dispatch` and wait for all of them to settle
async fn dispatch_all<A: Action>(dispatch: Dispatch<A>, actions: Vec<A>) -> Result<(), LoopError> {
    let pending: Vec<_> = actions.into_iter().map(|action| dispatch.send(action)).collect();
    future::join_all(pending).await.into_iter().collect()
}

fn execute_parallel<A: Action>(cmds: Vec<Cmd<A>>, batch: bool, ctx: &Context<A>) -> Execution<A> {
    let mut pending: Vec<ActionsFuture<A>> = Vec::with_capacity(cmds.len());

    for cmd in cmds {
        let actions = match execute(cmd, ctx) {
            Ok(Some(actions)) => actions,
            Ok(None) => continue,
            Err(error) => {
                finish_detached(pending);
                return Err(error);
            },
        };

        if batch {
            pending.push(actions);
        } else {
            let dispatch = ctx.dispatch().clone();
            pending.push(
                async move {
                    dispatch_all(dispatch, actions.await?).await?;
                    Ok(Vec::new())
                }
                .boxed(),
            );
        }
    }

    if pending.is_empty() {
        return Ok(None);
    }

    Ok(Some(
        async move {
            // Every child settles before the first failure (in declaration order) is reported
            let settled = future::join_all(pending)
                .await
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if batch { flatten(settled) } else { Vec::new() })
        }
        .boxed(),
    ))
}

fn execute_sequence<A: Action>(cmds: Vec<Cmd<A>>, batch: bool, ctx: Context<A>) -> Execution<A> {
    let mut children = cmds.into_iter();
    let Some(first) = children.next() else {
        return Ok(None);
    };
    let first = execute(first, &ctx)?;

    Ok(Some(
        async move {
            let mut collected = Vec::new();
            let mut current = first;

            loop {
                let actions = match current {
                    Some(actions) => actions.await?,
                    None => Vec::new(),
                };

                if batch {
                    collected.extend(actions);
                } else {
                    dispatch_all(ctx.dispatch().clone(), actions).await?;
                }

                let Some(next) = children.next() else {
                    break;
                };
                current = execute(next, &ctx)?;
            }

            Ok(collected)
        }
        .boxed(),
    ))
}
