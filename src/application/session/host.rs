//! Session compiler host
//!
//! Composed once per session. Sources are read through the bundler's input
//! filesystem, outputs land in the session's store (or on disk under
//! `tempBuildDir`), and every script output is recorded in the
//! source/destination map.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::application::resolve::ModuleResolver;
use crate::config::{OutputTarget, JS_EXTENSIONS};
use crate::domain::entities::SourceDestMap;
use crate::domain::ports::compiler::CompilerHost;
use crate::domain::ports::file_host::FileHost;
use crate::domain::ports::resolver::ResolvedModule;
use crate::domain::value_objects::paths::{has_suffix, normalize};
use crate::infrastructure::fs::LocalFileHost;

pub struct SessionCompilerHost {
    fs: Arc<dyn FileHost>,
    output: OutputTarget,
    disk: LocalFileHost,
    map: Arc<Mutex<SourceDestMap>>,
    resolver: Mutex<Arc<ModuleResolver>>,
}

impl SessionCompilerHost {
    pub fn new(
        fs: Arc<dyn FileHost>,
        output: OutputTarget,
        map: Arc<Mutex<SourceDestMap>>,
        resolver: ModuleResolver,
    ) -> Self {
        Self {
            fs,
            output,
            disk: LocalFileHost::new(),
            map,
            resolver: Mutex::new(Arc::new(resolver)),
        }
    }

    /// Swap in the resolver for a newly created program.
    pub fn set_resolver(&self, resolver: ModuleResolver) {
        *self.lock_resolver() = Arc::new(resolver);
    }

    pub fn resolver(&self) -> Arc<ModuleResolver> {
        Arc::clone(&self.lock_resolver())
    }

    fn lock_resolver(&self) -> MutexGuard<'_, Arc<ModuleResolver>> {
        self.resolver.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn in_store(&self, path: &Path) -> bool {
        self.output
            .store()
            .map(|store| store.is_inside_private_root(path))
            .unwrap_or(false)
    }
}

fn is_script_output(path: &Path) -> bool {
    JS_EXTENSIONS.iter().any(|ext| has_suffix(path, ext))
}

impl CompilerHost for SessionCompilerHost {
    fn read_file(&self, path: &Path) -> Option<String> {
        match self.output.store() {
            Some(store) if store.is_inside_private_root(path) => store.read_to_string(path).ok(),
            _ => self.fs.read_to_string(path).ok(),
        }
    }

    fn write_file(&self, path: &Path, data: &str, source_files: &[PathBuf]) -> Result<(), String> {
        let path = normalize(path);
        let written = match &self.output {
            OutputTarget::Virtual(store) => store.write(&path, data),
            OutputTarget::Disk(_) => self.disk.write(&path, data.as_bytes()),
        };
        written.map_err(|e| e.to_string())?;

        if is_script_output(&path) {
            if let Some(source) = source_files.first() {
                self.map
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .record(path, normalize(source));
            }
        }
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> bool {
        match self.output.store() {
            Some(store) if store.is_inside_private_root(path) => store.is_file(path),
            _ => self.fs.is_file(path),
        }
    }

    fn directory_exists(&self, path: &Path) -> bool {
        match self.output.store() {
            Some(store) if store.is_inside_private_root(path) => store.is_directory(path),
            _ => self.fs.is_dir(path),
        }
    }

    fn get_directories(&self, path: &Path) -> Vec<String> {
        if let Some(store) = self.output.store().filter(|_| self.in_store(path)) {
            return store.directories(path);
        }
        self.fs
            .read_dir(path)
            .map(|names| {
                names
                    .into_iter()
                    .filter(|name| self.fs.is_dir(&path.join(name)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn realpath(&self, path: &Path) -> PathBuf {
        normalize(path)
    }

    fn resolve_module_names(
        &self,
        module_names: &[String],
        containing_file: &Path,
    ) -> Vec<Option<ResolvedModule>> {
        // Clone out so a program swap never waits on a resolution in flight
        let resolver = self.resolver();
        resolver.resolve(module_names, containing_file)
    }
}
