//! Compiler engine port
//!
//! The wrapped compiler is an external collaborator. This module defines the
//! capability contracts it is driven through: a one-shot emit, a persistent
//! watch loop that reports status by numeric code, and the host the engine
//! reads sources and writes outputs through.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::ports::resolver::{NativeResolver, ResolvedModule};
use crate::domain::value_objects::CompilerOptions;
use crate::error::BridgeResult;

/// Status code reported when the watch loop notices a source change
pub const FILE_CHANGE_DETECTED: u32 = 6032;

/// Status code reported when a watch compilation (initial or rebuild) ends
pub const COMPILATION_FINISHED: u32 = 6042;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Message,
}

/// A diagnostic or status message produced by the compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: String,
    pub file: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            category: DiagnosticCategory::Error,
            message: message.into(),
            file: None,
        }
    }

    pub fn message(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            category: DiagnosticCategory::Message,
            message: message.into(),
            file: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}: TS{}: {}", file.display(), self.code, self.message),
            None => write!(f, "TS{}: {}", self.code, self.message),
        }
    }
}

/// Everything the engine needs to start a build
#[derive(Debug, Clone, PartialEq)]
pub struct CompileRequest {
    /// Config file the engine re-reads in watch mode (absent for default config)
    pub config_file: Option<PathBuf>,
    pub root_files: Vec<PathBuf>,
    /// Full option set for one-shot builds; for watch builds with a config
    /// file these are the overrides applied on top of the re-read config
    pub options: CompilerOptions,
}

/// Outcome of a one-shot emit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmitResult {
    pub diagnostics: Vec<Diagnostic>,
    /// Longest common directory of all root files, as computed by the compiler
    pub common_source_directory: Option<PathBuf>,
}

/// A program the watch loop just created for a new cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramInfo {
    pub root_files: Vec<PathBuf>,
    pub options: CompilerOptions,
    pub common_source_directory: Option<PathBuf>,
}

/// Host the engine performs all file access and module resolution through
pub trait CompilerHost: Send + Sync {
    fn read_file(&self, path: &Path) -> Option<String>;

    /// Write an emitted file. `source_files` are the inputs it was produced
    /// from; the error string is what the compiler reports to its callback.
    fn write_file(&self, path: &Path, data: &str, source_files: &[PathBuf]) -> Result<(), String>;

    fn file_exists(&self, path: &Path) -> bool;

    fn directory_exists(&self, path: &Path) -> bool;

    fn get_directories(&self, path: &Path) -> Vec<String>;

    fn realpath(&self, path: &Path) -> PathBuf;

    /// One result per name, in order; `None` where resolution failed.
    fn resolve_module_names(
        &self,
        module_names: &[String],
        containing_file: &Path,
    ) -> Vec<Option<ResolvedModule>>;
}

/// Receives watch-loop notifications
pub trait WatchReporter: Send + Sync {
    /// A compiler diagnostic (error/warning) from inside the watch loop
    fn on_diagnostic(&self, diagnostic: &Diagnostic);

    /// A status notification; see [`FILE_CHANGE_DETECTED`] and [`COMPILATION_FINISHED`]
    fn on_status(&self, diagnostic: &Diagnostic);

    /// The loop created a new program (called once per cycle, before emit)
    fn on_program_created(&self, program: &ProgramInfo);
}

/// Identifier of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Timer scheduling the watch loop must use, so that stopping the loop can
/// cancel everything it scheduled
pub trait TimerHost: Send + Sync {
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>) -> TimerId;

    fn clear_timeout(&self, id: TimerId);
}

/// A running watch loop
pub trait WatchProgram: Send {
    /// Replace the root file list (only meaningful without a config file)
    fn update_root_files(&mut self, files: &[PathBuf]);

    /// Release engine-side resources
    fn close(&mut self) {}
}

/// The wrapped compiler
pub trait CompilerEngine: Send + Sync {
    /// Run one full build synchronously.
    fn emit(&self, request: &CompileRequest, host: &dyn CompilerHost) -> EmitResult;

    /// Start a persistent watch loop. The initial compilation happens before
    /// this returns and ends with a [`COMPILATION_FINISHED`] status.
    fn watch(
        &self,
        request: CompileRequest,
        host: std::sync::Arc<dyn CompilerHost>,
        reporter: std::sync::Arc<dyn WatchReporter>,
        timers: std::sync::Arc<dyn TimerHost>,
    ) -> BridgeResult<Box<dyn WatchProgram>>;

    /// The compiler's own module resolution algorithm
    fn native_resolver(&self) -> std::sync::Arc<dyn NativeResolver>;
}
