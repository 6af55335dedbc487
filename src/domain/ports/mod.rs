//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the domain layer.
//! Infrastructure and the embedding bundler provide concrete implementations.

pub mod build_events;
pub mod bundler;
pub mod compiler;
pub mod file_host;
pub mod resolver;
pub mod watch_fs;

pub use build_events::{BuildEvent, BuildEventSink, FilteredEventSink, NoopEventSink};
pub use bundler::{BundlerCompiler, CompilerId};
pub use compiler::{
    CompileRequest, CompilerEngine, CompilerHost, Diagnostic, DiagnosticCategory, EmitResult,
    ProgramInfo, TimerHost, TimerId, WatchProgram, WatchReporter, COMPILATION_FINISHED,
    FILE_CHANGE_DETECTED,
};
pub use file_host::{EntryKind, FileHost, FileStat, FsError, FsResult};
pub use resolver::{ExternalResolver, NativeResolver, ResolutionCache, ResolveError, ResolvedModule};
pub use watch_fs::{WatchCallback, WatchChanges, WatchFileSystem, WatchSet, Watching};
