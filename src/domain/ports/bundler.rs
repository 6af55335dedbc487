//! Bundler compiler port
//!
//! One bundler compiler instance may drive many loader requests. Sessions are
//! owned per (compiler instance, configuration) pair, so the instance needs a
//! stable identity and a handful of hook points.

use std::fmt;
use std::sync::Arc;

use crate::domain::ports::file_host::FileHost;
use crate::domain::ports::resolver::ExternalResolver;
use crate::domain::ports::watch_fs::WatchFileSystem;

/// Stable identity of a bundler compiler instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompilerId(pub u64);

impl fmt::Display for CompilerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compiler#{}", self.0)
    }
}

/// The bundler-side compiler the loader runs inside
pub trait BundlerCompiler: Send + Sync {
    fn id(&self) -> CompilerId;

    /// Whether the bundler runs in watch mode
    fn is_watch_mode(&self) -> bool;

    /// Current input filesystem
    fn input_file_system(&self) -> Arc<dyn FileHost>;

    /// Replace the input filesystem (used to expose emitted files)
    fn set_input_file_system(&self, fs: Arc<dyn FileHost>);

    /// Resolver configured with the bundler's resolve options
    fn external_resolver(&self) -> Arc<dyn ExternalResolver>;

    /// Current watch filesystem, if the bundler has one
    fn watch_file_system(&self) -> Option<Arc<dyn WatchFileSystem>>;

    fn set_watch_file_system(&self, wfs: Arc<dyn WatchFileSystem>);

    /// Register a hook run when the bundler's watch loop closes
    fn on_watch_close(&self, hook: Box<dyn FnOnce() + Send>);
}
