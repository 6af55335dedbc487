//! Event Sink Implementations
//!
//! Concrete implementations of BuildEventSink:
//! - ConsoleEventSink: prefixed human-readable lines
//! - JsonEventSink: NDJSON output for tooling

mod console;
mod json;

pub use console::{describe, ConsoleEventSink, LOG_PREFIX};
pub use json::{event_to_json, JsonEventSink};
