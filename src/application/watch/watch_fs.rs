//! Watch filesystem decorator
//!
//! The bundler watches the source files it loaded, but what actually changes
//! on a rebuild are the emitted files. This decorator swaps project sources
//! for their emitted paths before handing the list to the wrapped watch
//! filesystem, and swaps emitted paths back to sources in every change
//! notification. Emitted files that live in the virtual store are watched
//! through a store subscription instead of the real filesystem.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::domain::ports::watch_fs::{
    WatchCallback, WatchChanges, WatchFileSystem, WatchSet, Watching,
};
use crate::domain::value_objects::paths::{is_child_path, normalize};
use crate::error::BridgeResult;
use crate::infrastructure::fs::{SubscriptionId, VirtualOutputStore};

/// Translation between source and emitted identities
pub trait OutputTranslator: Send + Sync {
    fn is_project_source_file(&self, path: &Path) -> bool;

    fn to_emitted_path(&self, source: &Path) -> PathBuf;

    fn to_source_path(&self, emitted: &Path) -> PathBuf;

    /// Directory the compiler emits into
    fn out_dir(&self) -> PathBuf;
}

pub struct ReplaceWatchFileSystem {
    inner: Arc<dyn WatchFileSystem>,
    translator: Arc<dyn OutputTranslator>,
    store: Option<Arc<VirtualOutputStore>>,
}

impl ReplaceWatchFileSystem {
    pub fn new(
        inner: Arc<dyn WatchFileSystem>,
        translator: Arc<dyn OutputTranslator>,
        store: Option<Arc<VirtualOutputStore>>,
    ) -> Self {
        Self {
            inner,
            translator,
            store,
        }
    }

    fn to_emitted(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        files
            .iter()
            .map(|file| {
                if self.translator.is_project_source_file(file) {
                    self.translator.to_emitted_path(file)
                } else {
                    file.clone()
                }
            })
            .collect()
    }
}

/// Rewrite emitted paths in a change batch back to their sources.
fn to_sources(
    translator: &dyn OutputTranslator,
    out_dir: &Path,
    mut changes: WatchChanges,
) -> WatchChanges {
    let files = std::mem::take(&mut changes.files_modified);
    changes.files_modified = files
        .into_iter()
        .map(|file| {
            if !is_child_path(out_dir, &file) {
                return file;
            }
            let source = translator.to_source_path(&file);
            if let Some(timestamp) = changes.file_timestamps.remove(&file) {
                changes.file_timestamps.insert(source.clone(), timestamp);
            }
            source
        })
        .collect();
    changes
}

struct ReplacedWatching {
    inner: Box<dyn Watching>,
    subscription: Option<(Arc<VirtualOutputStore>, SubscriptionId)>,
}

impl Watching for ReplacedWatching {
    fn close(&mut self) {
        if let Some((store, id)) = self.subscription.take() {
            store.unsubscribe(id);
        }
        self.inner.close();
    }
}

impl WatchFileSystem for ReplaceWatchFileSystem {
    fn watch(&self, set: WatchSet, callback: WatchCallback) -> BridgeResult<Box<dyn Watching>> {
        let out_dir = self.translator.out_dir();
        let files = self.to_emitted(&set.files);

        let (in_store, on_disk): (Vec<PathBuf>, Vec<PathBuf>) = match &self.store {
            Some(store) => files
                .into_iter()
                .partition(|f| store.is_inside_private_root(f)),
            None => (Vec::new(), files),
        };

        let translator = Arc::clone(&self.translator);
        let callback: Arc<dyn Fn(WatchChanges) + Send + Sync> = Arc::new(move |changes| {
            callback(to_sources(translator.as_ref(), &out_dir, changes))
        });

        let subscription = match &self.store {
            Some(store) if !in_store.is_empty() => {
                let watched: HashSet<PathBuf> = in_store.iter().map(|p| normalize(p)).collect();
                let cb = Arc::clone(&callback);
                let id = store.subscribe(Arc::new(move |paths: &[PathBuf]| {
                    let hits: Vec<PathBuf> = paths
                        .iter()
                        .filter(|p| watched.contains(p.as_path()))
                        .cloned()
                        .collect();
                    if hits.is_empty() {
                        return;
                    }
                    let now = SystemTime::now();
                    let mut changes = WatchChanges::default();
                    for hit in &hits {
                        changes.file_timestamps.insert(hit.clone(), now);
                    }
                    changes.files_modified = hits;
                    cb(changes);
                }));
                Some((Arc::clone(store), id))
            }
            _ => None,
        };

        let inner_set = WatchSet {
            files: on_disk,
            ..set
        };
        let cb = Arc::clone(&callback);
        let inner = match self.inner.watch(inner_set, Box::new(move |changes| cb(changes))) {
            Ok(inner) => inner,
            Err(err) => {
                if let (Some(store), Some((_, id))) = (&self.store, &subscription) {
                    store.unsubscribe(*id);
                }
                return Err(err);
            }
        };

        Ok(Box::new(ReplacedWatching {
            inner,
            subscription,
        }))
    }
}
