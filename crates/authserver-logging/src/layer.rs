//! Bridge from `tracing` events into the logger registry.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::event::{LogEvent, logger_name_from_target};
use crate::level::Level;
use crate::registry::LoggerRegistry;

/// A [`Layer`] that turns every enabled event into a [`LogEvent`] and
/// dispatches it through a [`LoggerRegistry`].
///
/// The event target is the logger name, with `::` replaced by `.`. Level
/// checks apply to this layer only, so layers composed next to it still see
/// every event.
#[derive(Debug, Clone)]
pub struct RegistryLayer {
    registry: Arc<LoggerRegistry>,
}

impl RegistryLayer {
    /// Creates a layer over `registry`.
    #[must_use]
    pub fn new(registry: Arc<LoggerRegistry>) -> Self {
        Self { registry }
    }

    /// The registry events are dispatched to.
    #[must_use]
    pub fn registry(&self) -> &LoggerRegistry {
        &self.registry
    }
}

impl<S: Subscriber> Layer<S> for RegistryLayer {
    // Not `enabled`: that would also filter sibling layers.
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Level::from(*metadata.level());
        let logger = logger_name_from_target(metadata.target());
        if !self.registry.is_enabled(&logger, level) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.registry
            .dispatch(&LogEvent::new(level, logger, visitor.finish()));
    }
}

/// Collects the `message` field and renders the rest as `key=value`.
#[derive(Debug, Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }

    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}
