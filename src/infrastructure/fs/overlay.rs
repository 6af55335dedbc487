//! Overlay File Host
//!
//! The bundler's input filesystem with the virtual store mounted at its
//! private root, so the bundler can read emitted files like any other file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::ports::file_host::{FileHost, FileStat, FsResult};
use crate::domain::value_objects::paths::normalize;

use super::virtual_store::VirtualOutputStore;

pub struct OverlayFileHost {
    store: Arc<VirtualOutputStore>,
    inner: Arc<dyn FileHost>,
}

impl OverlayFileHost {
    pub fn new(store: Arc<VirtualOutputStore>, inner: Arc<dyn FileHost>) -> Self {
        Self { store, inner }
    }

    pub fn store(&self) -> &Arc<VirtualOutputStore> {
        &self.store
    }

    /// The host this overlay delegates to outside the private root
    pub fn inner(&self) -> &Arc<dyn FileHost> {
        &self.inner
    }

    fn in_store(&self, path: &Path) -> bool {
        self.store.is_inside_private_root(path)
    }
}

impl FileHost for OverlayFileHost {
    fn stat(&self, path: &Path) -> FsResult<FileStat> {
        if self.in_store(path) {
            self.store.stat(path)
        } else {
            self.inner.stat(path)
        }
    }

    fn read(&self, path: &Path) -> FsResult<Vec<u8>> {
        if self.in_store(path) {
            self.store.read(path)
        } else {
            self.inner.read(path)
        }
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<String>> {
        if self.in_store(path) {
            self.store.read_dir(path)
        } else {
            self.inner.read_dir(path)
        }
    }

    fn join(&self, base: &Path, request: &str) -> PathBuf {
        if self.in_store(base) {
            self.store.resolve_path(&base.join(request))
        } else {
            self.inner.join(base, request)
        }
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        if self.in_store(path) {
            normalize(path)
        } else {
            self.inner.normalize(path)
        }
    }
}
