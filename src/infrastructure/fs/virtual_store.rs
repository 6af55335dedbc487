//! Virtual Output Store
//!
//! In-memory stand-in for the compiler's output directory. Every store owns a
//! private root under [`VIRTUAL_ROOT_PREFIX`]; the compiler is told to emit
//! there and the writes land in memory. Nothing here touches the disk.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use crate::domain::ports::file_host::{FileStat, FsError, FsResult};
use crate::domain::value_objects::paths::{self, normalize};

/// Prefix of every private root
pub const VIRTUAL_ROOT_PREFIX: &str = "/__tsbridge_virtual__";

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(0);

/// Listener called with the paths touched by a write or removal
pub type StoreListener = Arc<dyn Fn(&[PathBuf]) + Send + Sync>;

/// Handle returned by [`VirtualOutputStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone)]
struct StoredFile {
    content: Vec<u8>,
    modified: SystemTime,
}

#[derive(Default)]
struct StoreInner {
    files: BTreeMap<PathBuf, StoredFile>,
    dirs: BTreeSet<PathBuf>,
    listeners: Vec<(u64, StoreListener)>,
    next_listener: u64,
}

/// In-memory output tree
pub struct VirtualOutputStore {
    root: PathBuf,
    inner: Mutex<StoreInner>,
}

impl std::fmt::Debug for VirtualOutputStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualOutputStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Default for VirtualOutputStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualOutputStore {
    /// Create a store with a fresh, process-unique private root
    pub fn new() -> Self {
        let id = NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed);
        Self::with_root(PathBuf::from(VIRTUAL_ROOT_PREFIX).join(id.to_string()))
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = normalize(&root.into());
        let mut inner = StoreInner::default();
        insert_ancestors(&mut inner.dirs, &root);
        inner.dirs.insert(root.clone());
        Self {
            root,
            inner: Mutex::new(inner),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether `path` must be served by this store
    pub fn is_inside_private_root(&self, path: &Path) -> bool {
        paths::is_child_path(&self.root, path)
    }

    /// Canonical form of a path in this store; relative paths are taken
    /// relative to the private root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        paths::resolve(&self.root, path)
    }

    pub fn relative_path(&self, from: &Path, to: &Path) -> PathBuf {
        paths::relative_path(&self.resolve_path(from), &self.resolve_path(to))
    }

    /// Store `content` at `path`, creating implied directories.
    pub fn write(&self, path: &Path, content: impl Into<Vec<u8>>) -> FsResult<()> {
        let path = self.resolve_path(path);
        if !self.is_inside_private_root(&path) {
            return Err(FsError::Other(format!(
                "path '{}' is outside the private root '{}'",
                path.display(),
                self.root.display()
            )));
        }

        let listeners = {
            let mut inner = self.lock();
            if inner.dirs.contains(&path) {
                return Err(FsError::Other(format!(
                    "cannot write '{}': is a directory",
                    path.display()
                )));
            }
            insert_ancestors(&mut inner.dirs, &path);
            inner.files.insert(
                path.clone(),
                StoredFile {
                    content: content.into(),
                    modified: SystemTime::now(),
                },
            );
            inner.listeners.clone()
        };
        notify(&listeners, &[path]);
        Ok(())
    }

    pub fn read(&self, path: &Path) -> FsResult<Vec<u8>> {
        let path = self.resolve_path(path);
        let inner = self.lock();
        inner
            .files
            .get(&path)
            .map(|f| f.content.clone())
            .ok_or(FsError::NotFound(path))
    }

    pub fn read_to_string(&self, path: &Path) -> FsResult<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|_| FsError::InvalidUtf8(path.to_path_buf()))
    }

    /// File or directory exists
    pub fn exists(&self, path: &Path) -> bool {
        let path = self.resolve_path(path);
        let inner = self.lock();
        inner.files.contains_key(&path) || inner.dirs.contains(&path)
    }

    pub fn is_file(&self, path: &Path) -> bool {
        let path = self.resolve_path(path);
        self.lock().files.contains_key(&path)
    }

    pub fn is_directory(&self, path: &Path) -> bool {
        let path = self.resolve_path(path);
        self.lock().dirs.contains(&path)
    }

    pub fn stat(&self, path: &Path) -> FsResult<FileStat> {
        let path = self.resolve_path(path);
        let inner = self.lock();
        if let Some(file) = inner.files.get(&path) {
            return Ok(FileStat::file(file.content.len() as u64, Some(file.modified)));
        }
        if inner.dirs.contains(&path) {
            return Ok(FileStat::directory(None));
        }
        Err(FsError::NotFound(path))
    }

    /// Immediate children (files and directories) of a directory
    pub fn read_dir(&self, path: &Path) -> FsResult<Vec<String>> {
        let path = self.resolve_path(path);
        let inner = self.lock();
        if !inner.dirs.contains(&path) {
            if inner.files.contains_key(&path) {
                return Err(FsError::NotADirectory(path));
            }
            return Err(FsError::NotFound(path));
        }
        let mut names: BTreeSet<String> = BTreeSet::new();
        let children = inner
            .files
            .keys()
            .chain(inner.dirs.iter())
            .filter(|p| p.parent() == Some(path.as_path()));
        for child in children {
            if let Some(name) = child.file_name() {
                names.insert(name.to_string_lossy().into_owned());
            }
        }
        Ok(names.into_iter().collect())
    }

    /// Names of subdirectories of `path`
    pub fn directories(&self, path: &Path) -> Vec<String> {
        let path = self.resolve_path(path);
        let inner = self.lock();
        inner
            .dirs
            .iter()
            .filter(|p| p.parent() == Some(path.as_path()))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }

    /// Remove files. Paths that do not exist are skipped silently.
    /// Returns the paths that were actually removed.
    pub fn remove<P: AsRef<Path>>(&self, targets: &[P]) -> Vec<PathBuf> {
        let (removed, listeners) = {
            let mut inner = self.lock();
            let mut removed = Vec::new();
            for target in targets {
                let path = self.resolve_path(target.as_ref());
                if inner.files.remove(&path).is_some() {
                    removed.push(path);
                }
            }
            (removed, inner.listeners.clone())
        };
        if !removed.is_empty() {
            notify(&listeners, &removed);
        }
        removed
    }

    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    /// Observe writes and removals
    pub fn subscribe(&self, listener: StoreListener) -> SubscriptionId {
        let mut inner = self.lock();
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.push((id, listener));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().listeners.retain(|(lid, _)| *lid != id.0);
    }
}

fn insert_ancestors(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if !dirs.insert(dir.to_path_buf()) {
            break;
        }
        current = dir.parent();
    }
}

fn notify(listeners: &[(u64, StoreListener)], touched: &[PathBuf]) {
    for (_, listener) in listeners {
        listener(touched);
    }
}
