//! Structured event sinks
//!
//! One call = one event. An event is a SCREAMING_SNAKE name plus an
//! ordered list of key/value fields.

use std::fmt;
use std::sync::Mutex;

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Normal operations
    Info,
    /// Recoverable issues
    Warn,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Receiver for diagnostic events
pub trait EventSink: Send + Sync {
    /// Record an event with the given severity and fields
    fn emit(&self, severity: Severity, event: &str, fields: &[(&str, &str)]);

    /// Emit at INFO level
    fn info(&self, event: &str, fields: &[(&str, &str)]) {
        self.emit(Severity::Info, event, fields);
    }

    /// Emit at WARN level
    fn warn(&self, event: &str, fields: &[(&str, &str)]) {
        self.emit(Severity::Warn, event, fields);
    }
}

/// Forwards events to the `tracing` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let fields = render_fields(fields);
        match severity {
            Severity::Info => tracing::info!(event = %event, "{}", fields),
            Severity::Warn => tracing::warn!(event = %event, "{}", fields),
        }
    }
}

fn render_fields(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={:?}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// An event captured by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub severity: Severity,
    pub event: String,
    pub fields: Vec<(String, String)>,
}

impl RecordedEvent {
    /// Look up a field value by key
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory sink for tests
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events with the given name
    pub fn named(&self, event: &str) -> Vec<RecordedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event == event)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if let Ok(mut events) = self.events.lock() {
            events.push(RecordedEvent {
                severity,
                event: event.to_string(),
                fields: fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warn);
        assert_eq!(Severity::Warn.to_string(), "WARN");
    }

    #[test]
    fn test_memory_sink_records_fields() {
        let sink = MemorySink::new();
        sink.warn("RELATION_SKIPPED", &[("spec", "author"), ("reason", "grammar")]);
        sink.info("OTHER", &[]);

        let skipped = sink.named("RELATION_SKIPPED");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].severity, Severity::Warn);
        assert_eq!(skipped[0].field("spec"), Some("author"));
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_render_fields() {
        assert_eq!(render_fields(&[("a", "1"), ("b", "x y")]), "a=\"1\" b=\"x y\"");
    }
}
