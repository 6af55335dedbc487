//! Module resolution ports
//!
//! Two independent algorithms are reconciled by the resolution bridge:
//! the bundler's own resolver (aliases, extension order, package fields) and
//! the compiler's native resolver (which knows about declaration files).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::value_objects::CompilerOptions;

/// A successfully resolved module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub resolved_file_name: PathBuf,
    /// True when the module came from a package (e.g. `node_modules`)
    pub is_external_library_import: bool,
}

impl ResolvedModule {
    pub fn new(resolved_file_name: impl Into<PathBuf>) -> Self {
        Self {
            resolved_file_name: resolved_file_name.into(),
            is_external_library_import: false,
        }
    }
}

/// Failure from the bundler-side resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveError {
    pub request: String,
    pub message: String,
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot resolve '{}': {}", self.request, self.message)
    }
}

impl std::error::Error for ResolveError {}

/// The bundler's resolver, configured with the bundler's resolve options
pub trait ExternalResolver: Send + Sync {
    /// Resolve `request` as imported from a file inside `directory`.
    fn resolve(&self, directory: &Path, request: &str) -> Result<PathBuf, ResolveError>;
}

/// The compiler's own module resolution
pub trait NativeResolver: Send + Sync {
    fn resolve_module_name(
        &self,
        module_name: &str,
        containing_file: &Path,
        options: &CompilerOptions,
        cache: &ResolutionCache,
    ) -> Option<ResolvedModule>;
}

/// Per-program memo of native resolutions, keyed by containing directory and
/// module name. A fresh cache is created for every program.
#[derive(Debug)]
pub struct ResolutionCache {
    base_path: PathBuf,
    entries: Mutex<HashMap<(PathBuf, String), Option<ResolvedModule>>>,
}

impl ResolutionCache {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Directory relative module names are cached against
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn get(&self, directory: &Path, module_name: &str) -> Option<Option<ResolvedModule>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&(directory.to_path_buf(), module_name.to_string()))
            .cloned()
    }

    pub fn insert(&self, directory: &Path, module_name: &str, result: Option<ResolvedModule>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert((directory.to_path_buf(), module_name.to_string()), result);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
