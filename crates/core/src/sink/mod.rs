//! Event sinks.
//!
//! An [`EventSink`] records observability events. Recording is best effort:
//! a sink logs its own failures and never reports them to the chain, so an
//! unavailable log directory cannot break authentication.

pub mod background;
pub mod error;
pub mod file;
pub mod memory;

pub use background::BackgroundEventSink;
pub use error::{SinkError, SinkResult};
pub use file::FileEventSink;
pub use memory::MemoryEventSink;

use ac_protocol::Event;

/// Append-only recorder of events.
pub trait EventSink: Send + Sync {
    /// Record `event`. Events from one caller keep their submission order.
    fn emit(&self, event: Event);
}

/// Sink that forwards events to `tracing` at info level.
///
/// Used when no statistics directory is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: Event) {
        let fields = serde_json::Value::Object(event.fields.into_iter().collect());
        tracing::info!(
            timestamp = %event.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            kind = %event.kind,
            fields = %fields,
            "stats_event"
        );
    }
}
