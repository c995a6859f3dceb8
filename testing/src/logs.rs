//! Captured tracing output
//!
//! Install a [`LogCapture`] for the current thread and assert on the events
//! the loop emitted. With tokio's default test runtime every task is polled
//! on the test thread, so spawned dispatch work is captured too.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// One captured event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Severity of the event
    pub level: Level,
    /// The formatted message
    pub message: String,
}

/// Layer that stores every event it sees
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    /// Create an empty capture
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture events on the current thread until the guard drops
    #[must_use]
    pub fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    /// Every captured event, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Messages of the events logged at `level`
    #[must_use]
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .map(|event| event.message)
            .collect()
    }

    /// Number of events at `level` whose message contains `needle`
    #[must_use]
    pub fn count(&self, level: Level, needle: &str) -> usize {
        self.messages_at(level)
            .iter()
            .filter(|message| message.contains(needle))
            .count()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedEvent {
                level: *event.metadata().level(),
                message: visitor.message,
            });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}
