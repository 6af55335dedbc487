//! JSON Event Sink
//!
//! Outputs build events as NDJSON for tooling that wraps the bundler.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::domain::ports::{BuildEvent, BuildEventSink};

/// Event sink that outputs NDJSON events
pub struct JsonEventSink {
    writer: Mutex<Box<dyn Write + Send>>,
    verbose: bool,
}

impl JsonEventSink {
    /// Create a new JSON event sink writing to stdout
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Create a JSON event sink writing to a custom writer
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn write_event(&self, event: serde_json::Value) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", event);
            let _ = writer.flush();
        }
    }
}

/// JSON form of an event
pub fn event_to_json(event: &BuildEvent) -> serde_json::Value {
    match event {
        BuildEvent::Version { version } => serde_json::json!({
            "event": "version",
            "version": version,
        }),

        BuildEvent::ConfigResolved { config_file } => serde_json::json!({
            "event": "config_resolved",
            "config_file": config_file.as_ref().map(|p| p.display().to_string()),
        }),

        BuildEvent::BuildStarted { config_file, watch } => serde_json::json!({
            "event": "build_started",
            "config_file": config_file.as_ref().map(|p| p.display().to_string()),
            "watch": watch,
        }),

        BuildEvent::FileChangeDetected => serde_json::json!({
            "event": "file_change_detected",
        }),

        BuildEvent::CompilationFinished { elapsed_ms } => serde_json::json!({
            "event": "compilation_finished",
            "elapsed_ms": elapsed_ms,
        }),

        BuildEvent::OutputsDeleted { paths } => serde_json::json!({
            "event": "outputs_deleted",
            "paths": paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        }),

        BuildEvent::Info { message } => serde_json::json!({
            "event": "info",
            "message": message,
        }),

        BuildEvent::Verbose { message, code } => serde_json::json!({
            "event": "verbose",
            "message": message,
            "code": code,
        }),

        BuildEvent::Error { watching, message } => serde_json::json!({
            "event": "error",
            "watching": watching,
            "message": message,
        }),
    }
}

impl BuildEventSink for JsonEventSink {
    fn on_event(&self, event: BuildEvent) {
        self.write_event(event_to_json(&event));
    }

    fn wants_verbose(&self) -> bool {
        self.verbose
    }
}
