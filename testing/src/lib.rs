//! # Reloop Testing
//!
//! Testing utilities and helpers for the Reloop architecture.
//!
//! This crate provides:
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Assertion helpers for commands and their simulations
//! - A host store that records dispatched actions ([`RecordingHost`])
//! - Captured tracing output ([`LogCapture`])
//! - Property-based testing strategies for command trees
//!
//! ## Example
//!
//! ```ignore
//! use reloop_runtime::{LoopConfig, Store};
//! use reloop_testing::RecordingHost;
//!
//! #[tokio::test]
//! async fn test_load_flow() {
//!     let store = Store::with_host(
//!         UserState::default(),
//!         UserReducer,
//!         test_environment(),
//!         LoopConfig::default(),
//!         RecordingHost::new,
//!     );
//!
//!     store.dispatch(UserAction::Load { id: 1 }).await.unwrap();
//!
//!     assert_eq!(store.host().action_types(), ["LOAD", "LOADED"]);
//! }
//! ```

pub mod logs;
pub mod mocks;
pub mod reducer_test;

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Print tracing output through the test harness
    ///
    /// Honors `RUST_LOG`. Safe to call from every test; only the first call
    /// installs the subscriber.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities
///
/// [`CmdTree`] describes a command built from actions, lists and maps. It can
/// be turned into a real `Cmd` and into the `Simulation` mirroring it,
/// so properties can compare what executing the command dispatches with what
/// simulating it yields.
pub mod properties {
    use proptest::prelude::*;
    use reloop_core::simulate::Simulation;
    use reloop_core::{Cmd, ListOptions};

    /// Prefix `Map` nodes add to the actions they yield
    pub const TAG: &str = "TAGGED/";

    /// Shape of a generated command
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum CmdTree {
        /// `Cmd::None`
        Empty,
        /// `Cmd::Action` with this action
        Action(String),
        /// `Cmd::List` of these children
        List {
            /// Children in declaration order
            children: Vec<CmdTree>,
            /// Run children one after another
            sequence: bool,
            /// Collect children's actions instead of dispatching them
            batch: bool,
        },
        /// `Cmd::map` prefixing [`TAG`]
        Map(Box<CmdTree>),
    }

    impl CmdTree {
        /// Build the command this tree describes
        #[must_use]
        pub fn to_cmd(&self) -> Cmd<String> {
            match self {
                Self::Empty => Cmd::none(),
                Self::Action(action) => Cmd::action(action.clone()),
                Self::List {
                    children,
                    sequence,
                    batch,
                } => Cmd::list_with(
                    children.iter().map(Self::to_cmd).collect(),
                    ListOptions {
                        sequence: *sequence,
                        batch: *batch,
                    },
                ),
                Self::Map(inner) => Cmd::map(inner.to_cmd(), |action: String| format!("{TAG}{action}")),
            }
        }

        /// Build the simulation mirroring this tree
        #[must_use]
        pub fn simulation(&self) -> Simulation {
            match self {
                Self::Empty | Self::Action(_) => Simulation::Ignored,
                Self::List { children, .. } => Simulation::list(children.iter().map(Self::simulation)),
                Self::Map(inner) => inner.simulation(),
            }
        }

        /// Number of action leaves
        #[must_use]
        pub fn action_count(&self) -> usize {
            match self {
                Self::Empty => 0,
                Self::Action(_) => 1,
                Self::List { children, .. } => children.iter().map(Self::action_count).sum(),
                Self::Map(inner) => inner.action_count(),
            }
        }
    }

    /// Action names used in generated trees
    pub fn action_name() -> impl Strategy<Value = String> {
        "[A-E]{1,3}".prop_map(|name| format!("ACT_{name}"))
    }

    /// Command trees up to four levels deep
    pub fn cmd_tree() -> impl Strategy<Value = CmdTree> {
        let leaf = prop_oneof![
            1 => Just(CmdTree::Empty),
            4 => action_name().prop_map(CmdTree::Action),
        ];

        leaf.prop_recursive(4, 32, 5, |inner| {
            prop_oneof![
                (prop::collection::vec(inner.clone(), 0..5), any::<bool>(), any::<bool>()).prop_map(
                    |(children, sequence, batch)| CmdTree::List {
                        children,
                        sequence,
                        batch,
                    }
                ),
                inner.prop_map(|tree| CmdTree::Map(Box::new(tree))),
            ]
        })
    }
}

// Re-export commonly used items
pub use logs::{CapturedEvent, LogCapture};
pub use mocks::{CallLog, RecordingHost};
pub use reducer_test::{ReducerTest, assertions};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::properties::{CmdTree, TAG, cmd_tree};
    use proptest::prelude::*;
    use reloop_core::simulate::simulate;

    #[test]
    fn test_tree_simulation_tags_mapped_actions() {
        let tree = CmdTree::List {
            children: vec![
                CmdTree::Action("A".to_string()),
                CmdTree::Map(Box::new(CmdTree::Action("B".to_string()))),
                CmdTree::Empty,
            ],
            sequence: false,
            batch: true,
        };

        let simulated = simulate(&tree.to_cmd(), tree.simulation()).unwrap();
        assert_eq!(simulated.into_vec(), vec!["A".to_string(), format!("{TAG}B")]);
    }

    proptest! {
        #[test]
        fn generated_trees_simulate_every_leaf(tree in cmd_tree()) {
            let simulated = simulate(&tree.to_cmd(), tree.simulation()).unwrap();
            prop_assert_eq!(simulated.into_vec().len(), tree.action_count());
        }
    }
}
