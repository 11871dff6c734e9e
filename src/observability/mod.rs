//! Observability for modelforge
//!
//! - Structured JSON logging ([`Logger`])
//! - Typed events ([`Event`])
//! - Operation counters ([`MetricsRegistry`])
//!
//! Observability is write-only from the engine's point of view: nothing it
//! does can fail or alter an operation.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event at INFO
pub fn log_event(event: Event) {
    Logger::info(event.as_str(), &[]);
}

/// Log a lifecycle event with fields at INFO
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::info(event.as_str(), fields);
}
