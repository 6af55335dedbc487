//! Fake bundler compiler and table-driven resolvers

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tsbridge::domain::ports::{
    BundlerCompiler, CompilerId, ExternalResolver, FileHost, NativeResolver, ResolutionCache,
    ResolveError, ResolvedModule, WatchCallback, WatchFileSystem, WatchSet, Watching,
};
use tsbridge::domain::value_objects::CompilerOptions;
use tsbridge::BridgeResult;

/// Resolves requests from a fixed table, ignoring the importing directory
#[derive(Default)]
pub struct TableResolver {
    table: Mutex<HashMap<String, PathBuf>>,
}

impl TableResolver {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            table: Mutex::new(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), PathBuf::from(v)))
                    .collect(),
            ),
        }
    }

    fn lookup(&self, request: &str) -> Option<PathBuf> {
        self.table.lock().unwrap().get(request).cloned()
    }
}

impl ExternalResolver for TableResolver {
    fn resolve(&self, _directory: &Path, request: &str) -> Result<PathBuf, ResolveError> {
        self.lookup(request).ok_or_else(|| ResolveError {
            request: request.to_string(),
            message: "module not found".to_string(),
        })
    }
}

/// Native resolver backed by a table; counts calls
#[derive(Default)]
pub struct TableNative {
    table: TableResolver,
    pub calls: AtomicUsize,
}

impl TableNative {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            table: TableResolver::new(entries),
            calls: AtomicUsize::new(0),
        }
    }
}

impl NativeResolver for TableNative {
    fn resolve_module_name(
        &self,
        module_name: &str,
        _containing_file: &Path,
        _options: &CompilerOptions,
        _cache: &ResolutionCache,
    ) -> Option<ResolvedModule> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table.lookup(module_name).map(ResolvedModule::new)
    }
}

/// Watch filesystem that remembers what it was asked to watch
#[derive(Default)]
pub struct CapturingWatchFs {
    pub sets: Mutex<Vec<WatchSet>>,
    pub callbacks: Mutex<Vec<WatchCallback>>,
}

struct NoopWatching;

impl Watching for NoopWatching {
    fn close(&mut self) {}
}

impl WatchFileSystem for CapturingWatchFs {
    fn watch(&self, set: WatchSet, callback: WatchCallback) -> BridgeResult<Box<dyn Watching>> {
        self.sets.lock().unwrap().push(set);
        self.callbacks.lock().unwrap().push(callback);
        Ok(Box::new(NoopWatching))
    }
}

pub struct FakeBundler {
    id: CompilerId,
    watch: bool,
    fs: Mutex<Arc<dyn FileHost>>,
    wfs: Mutex<Option<Arc<dyn WatchFileSystem>>>,
    external: Arc<TableResolver>,
    close_hooks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    pub fs_replacements: AtomicUsize,
    pub wfs_replacements: AtomicUsize,
}

impl FakeBundler {
    pub fn new(id: u64, watch: bool, fs: Arc<dyn FileHost>) -> Arc<Self> {
        Self::with_resolver(id, watch, fs, TableResolver::default())
    }

    pub fn with_resolver(
        id: u64,
        watch: bool,
        fs: Arc<dyn FileHost>,
        external: TableResolver,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: CompilerId(id),
            watch,
            fs: Mutex::new(fs),
            wfs: Mutex::new(None),
            external: Arc::new(external),
            close_hooks: Mutex::new(Vec::new()),
            fs_replacements: AtomicUsize::new(0),
            wfs_replacements: AtomicUsize::new(0),
        })
    }

    /// Start with a watch filesystem already installed
    pub fn set_initial_watch_fs(&self, wfs: Arc<dyn WatchFileSystem>) {
        *self.wfs.lock().unwrap() = Some(wfs);
    }

    /// Run the watch-close hooks, as the bundler does when its watcher closes
    pub fn close_watch(&self) {
        let hooks: Vec<_> = self.close_hooks.lock().unwrap().drain(..).collect();
        for hook in hooks {
            hook();
        }
    }

    pub fn close_hook_count(&self) -> usize {
        self.close_hooks.lock().unwrap().len()
    }
}

impl BundlerCompiler for FakeBundler {
    fn id(&self) -> CompilerId {
        self.id
    }

    fn is_watch_mode(&self) -> bool {
        self.watch
    }

    fn input_file_system(&self) -> Arc<dyn FileHost> {
        self.fs.lock().unwrap().clone()
    }

    fn set_input_file_system(&self, fs: Arc<dyn FileHost>) {
        self.fs_replacements.fetch_add(1, Ordering::SeqCst);
        *self.fs.lock().unwrap() = fs;
    }

    fn external_resolver(&self) -> Arc<dyn ExternalResolver> {
        self.external.clone()
    }

    fn watch_file_system(&self) -> Option<Arc<dyn WatchFileSystem>> {
        self.wfs.lock().unwrap().clone()
    }

    fn set_watch_file_system(&self, wfs: Arc<dyn WatchFileSystem>) {
        self.wfs_replacements.fetch_add(1, Ordering::SeqCst);
        *self.wfs.lock().unwrap() = Some(wfs);
    }

    fn on_watch_close(&self, hook: Box<dyn FnOnce() + Send>) {
        self.close_hooks.lock().unwrap().push(hook);
    }
}
