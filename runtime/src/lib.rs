//! # Reloop Runtime
//!
//! Dispatch loop for the Reloop architecture.
//!
//! This crate provides the [`Store`] that applies `Loop`-returning reducers,
//! executes the commands they emit and feeds the resulting actions back in.
//!
//! ## Core Components
//!
//! - **Store**: Wraps a host store, queues and drains commands
//! - **Host**: The state container the loop wraps ([`HostStore`], [`BasicStore`])
//! - **Config**: [`LoopConfig`] for logging and cascade limits
//! - **Metrics**: Prometheus counters for dispatches and commands
//!
//! ## Example
//!
//! ```ignore
//! use reloop_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Dispatch and wait for every resulting command to settle
//! store.dispatch(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.get_state().some_field;
//! ```

/// Dispatch loop configuration
pub mod config;

/// Host store interface and the default in-process host
pub mod host;

/// Prometheus metrics for observability
pub mod metrics;

/// The dispatch loop
pub mod store;

// Re-export for convenience
pub use config::LoopConfig;
pub use host::{BasicStore, HostReducer, HostStore, Listener, SubscriptionId};
pub use reloop_core::LoopError;
pub use store::{DispatchHandle, Store};
