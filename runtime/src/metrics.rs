//! Prometheus metrics for the dispatch loop.
//!
//! The store records through the `metrics` facade unconditionally; nothing is
//! collected until a recorder is installed. [`MetricsRecorder`] installs the
//! Prometheus one and renders the scrape text.
//!
//! # Example
//!
//! ```rust,no_run
//! use reloop_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! // ... dispatch some actions ...
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use reloop_core::CmdKind;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installs the Prometheus recorder and renders its output.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe the loop's metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// Only one recorder can be installed per process. If one already is
    /// (e.g., in tests), this logs a warning, succeeds and leaves
    /// [`MetricsRecorder::render`] returning `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this recorder was not the one installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

impl std::fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRecorder")
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "reloop_dispatches_total",
        "Total number of actions dispatched through the loop"
    );
    describe_histogram!(
        "reloop_reducer_duration_seconds",
        "Time spent applying the reducer and committing state"
    );
    describe_counter!(
        "reloop_commands_executed_total",
        "Total number of queued commands executed, by command kind"
    );
    describe_counter!(
        "reloop_commands_failed_total",
        "Total number of command failures no fail creator handled"
    );
    describe_counter!(
        "reloop_cascade_limit_total",
        "Total number of dispatches rejected by the cascade depth limit"
    );
}

/// Reducer metrics recorder.
pub struct ReducerMetrics;

impl ReducerMetrics {
    /// Record a dispatched action.
    pub fn record_dispatch(duration: Duration) {
        counter!("reloop_dispatches_total").increment(1);
        histogram!("reloop_reducer_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a dispatch rejected for exceeding the cascade depth.
    pub fn record_cascade_limit() {
        counter!("reloop_cascade_limit_total").increment(1);
    }
}

/// Command metrics recorder.
pub struct CommandMetrics;

impl CommandMetrics {
    /// Record a queued command handed to the interpreter.
    pub fn record_execution(kind: CmdKind) {
        counter!("reloop_commands_executed_total", "type" => kind.as_str()).increment(1);
    }

    /// Record an unhandled command failure.
    pub fn record_failure() {
        counter!("reloop_commands_failed_total").increment(1);
    }
}
