//! Observability subsystem for docrest
//!
//! The query engine never prints. Diagnostic events go to an injected
//! [`EventSink`]: [`TracingSink`] in the binary, [`MemorySink`] in tests.
//!
//! # Usage
//!
//! ```ignore
//! use docrest::observability::{EventSink, TracingSink};
//!
//! let sink = TracingSink;
//! sink.warn("RELATION_SKIPPED", &[("spec", "author")]);
//! ```

mod sink;

pub use sink::{EventSink, MemorySink, RecordedEvent, Severity, TracingSink};
