//! Dispatch loop configuration

/// Action type the initial command is attributed to
pub const DEFAULT_INIT_ACTION_TYPE: &str = "@@reloop/INIT";

/// Configuration for [`Store`](crate::Store) instances
///
/// # Example
///
/// ```ignore
/// let config = LoopConfig::default()
///     .with_log_handled_failures(false)
///     .with_max_cascade_depth(64);
///
/// let store = Store::with_config(initial, reducer, env, config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Emit a warning when a fail creator handles a command failure
    pub log_handled_failures: bool,
    /// Action type reported for failures of the initial command
    pub init_action_type: String,
    /// Maximum number of derived dispatches chained from one external dispatch
    ///
    /// `None` means unbounded.
    pub max_cascade_depth: Option<usize>,
}

impl LoopConfig {
    /// Toggle the warning for handled failures
    #[must_use]
    pub const fn with_log_handled_failures(mut self, enabled: bool) -> Self {
        self.log_handled_failures = enabled;
        self
    }

    /// Set the action type of the initial command
    #[must_use]
    pub fn with_init_action_type(mut self, action_type: impl Into<String>) -> Self {
        self.init_action_type = action_type.into();
        self
    }

    /// Bound the depth of derived dispatches
    #[must_use]
    pub const fn with_max_cascade_depth(mut self, depth: usize) -> Self {
        self.max_cascade_depth = Some(depth);
        self
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            log_handled_failures: true,
            init_action_type: DEFAULT_INIT_ACTION_TYPE.to_string(),
            max_cascade_depth: None,
        }
    }
}
