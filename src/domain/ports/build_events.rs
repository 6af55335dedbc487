//! Build Event Port
//!
//! All logging and error reporting flows through this port. The loader
//! decides what to report; sinks decide how (console, NDJSON, nothing).

use std::path::PathBuf;
use std::sync::Arc;

/// Event emitted while sessions are configured and builds run
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    /// Loader version, emitted once per session when requested
    Version { version: String },

    /// Configuration chosen for a new session (`None` = default configuration)
    ConfigResolved { config_file: Option<PathBuf> },

    /// A compiler run or watch loop is starting
    BuildStarted {
        config_file: Option<PathBuf>,
        watch: bool,
    },

    /// The watch loop noticed a source change
    FileChangeDetected,

    /// A watch cycle finished; `elapsed_ms` is absent for the initial build
    CompilationFinished { elapsed_ms: Option<u128> },

    /// Emitted files removed from the output store
    OutputsDeleted { paths: Vec<PathBuf> },

    /// General information
    Info { message: String },

    /// Diagnostic chatter, only for sinks that want it
    Verbose { message: String, code: Option<u32> },

    /// A reported error; `watching` tells whether a watch loop is active
    Error { watching: bool, message: String },
}

impl BuildEvent {
    pub fn info(message: impl Into<String>) -> Self {
        BuildEvent::Info {
            message: message.into(),
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, BuildEvent::Verbose { .. })
    }
}

/// Trait for receiving build events
///
/// Implementations:
/// - `ConsoleEventSink`: prefixed lines on stderr
/// - `JsonEventSink`: NDJSON event stream
/// - `NoopEventSink`: silent operation
pub trait BuildEventSink: Send + Sync {
    fn on_event(&self, event: BuildEvent);

    /// Whether verbose diagnostic chatter should be delivered
    fn wants_verbose(&self) -> bool {
        false
    }
}

/// Emit through a sink, dropping verbose events the sink does not want.
pub fn emit(sink: &dyn BuildEventSink, event: BuildEvent) {
    if event.is_verbose() && !sink.wants_verbose() {
        return;
    }
    sink.on_event(event);
}

/// No-op event sink for silent operation
pub struct NoopEventSink;

impl BuildEventSink for NoopEventSink {
    fn on_event(&self, _event: BuildEvent) {}
}

/// Per-session view of a shared sink
///
/// `silent` drops everything except errors. Verbose events reach the inner
/// sink only when both `verbose` is set and the inner sink wants them.
pub struct FilteredEventSink {
    inner: Arc<dyn BuildEventSink>,
    silent: bool,
    verbose: bool,
}

impl FilteredEventSink {
    pub fn new(inner: Arc<dyn BuildEventSink>, silent: bool, verbose: bool) -> Self {
        Self {
            inner,
            silent,
            verbose,
        }
    }
}

impl BuildEventSink for FilteredEventSink {
    fn on_event(&self, event: BuildEvent) {
        if self.silent && !matches!(event, BuildEvent::Error { .. }) {
            return;
        }
        self.inner.on_event(event);
    }

    fn wants_verbose(&self) -> bool {
        self.verbose && !self.silent && self.inner.wants_verbose()
    }
}
