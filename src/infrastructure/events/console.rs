//! Console Event Sink
//!
//! Human-readable log lines, each prefixed with the loader name.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::domain::ports::{BuildEvent, BuildEventSink};

/// Prefix on every console line
pub const LOG_PREFIX: &str = "[tsbridge] ";

pub struct ConsoleEventSink {
    writer: Mutex<Box<dyn Write + Send>>,
    silent: bool,
    verbose: bool,
}

impl ConsoleEventSink {
    pub fn stderr() -> Self {
        Self::with_writer(io::stderr())
    }

    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            silent: false,
            verbose: false,
        }
    }

    /// Suppress informational output. Errors are still printed.
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn line(&self, text: &str) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}{}", LOG_PREFIX, text);
        }
    }
}

/// Console text for an event
pub fn describe(event: &BuildEvent) -> String {
    match event {
        BuildEvent::Version { version } => format!("tsbridge version {}", version),
        BuildEvent::ConfigResolved { config_file: None } => "Using default configuration".to_string(),
        BuildEvent::ConfigResolved {
            config_file: Some(path),
        } => format!("Using tsconfig file: '{}'", path.display()),
        BuildEvent::BuildStarted { watch: true, .. } => "Starting compilation in watch mode".to_string(),
        BuildEvent::BuildStarted { watch: false, .. } => "Starting compilation".to_string(),
        BuildEvent::FileChangeDetected => "TypeScript file change detected.".to_string(),
        BuildEvent::CompilationFinished { elapsed_ms: Some(ms) } => {
            format!("TypeScript compilation finished. (time = {} ms.)", ms)
        }
        BuildEvent::CompilationFinished { elapsed_ms: None } => {
            "TypeScript compilation finished.".to_string()
        }
        BuildEvent::OutputsDeleted { paths } => {
            format!("Removed {} emitted file(s)", paths.len())
        }
        BuildEvent::Info { message } => message.clone(),
        BuildEvent::Verbose { message, .. } => message.clone(),
        BuildEvent::Error { message, .. } => format!("error: {}", message),
    }
}

impl BuildEventSink for ConsoleEventSink {
    fn on_event(&self, event: BuildEvent) {
        let is_error = matches!(event, BuildEvent::Error { .. });
        if self.silent && !is_error {
            return;
        }
        self.line(&describe(&event));
    }

    fn wants_verbose(&self) -> bool {
        self.verbose && !self.silent
    }
}
