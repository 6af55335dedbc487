//! notify-backed watch filesystem
//!
//! A plain `WatchFileSystem` for hosts that do not bring their own. Files
//! are watched through their parent directory; directories recursively.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::domain::ports::watch_fs::{WatchCallback, WatchChanges, WatchFileSystem, WatchSet, Watching};
use crate::domain::value_objects::paths::normalize;
use crate::error::{BridgeError, BridgeResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyWatchFileSystem;

impl NotifyWatchFileSystem {
    pub fn new() -> Self {
        Self
    }
}

struct WatchedPaths {
    files: HashSet<PathBuf>,
    dirs: Vec<PathBuf>,
    missing: HashSet<PathBuf>,
}

impl WatchedPaths {
    fn from_set(set: &WatchSet) -> Self {
        Self {
            files: set.files.iter().map(|p| normalize(p)).collect(),
            dirs: set.dirs.iter().map(|p| normalize(p)).collect(),
            missing: set.missing.iter().map(|p| normalize(p)).collect(),
        }
    }

    /// Sort raw event paths into the buckets the bundler asked about
    fn classify(&self, paths: &[PathBuf]) -> WatchChanges {
        let mut changes = WatchChanges::default();
        let mut dirs_hit: BTreeSet<PathBuf> = BTreeSet::new();

        for raw in paths {
            let path = normalize(raw);
            if self.files.contains(&path) {
                changes
                    .file_timestamps
                    .insert(path.clone(), modified_or_now(&path));
                changes.files_modified.push(path.clone());
            }
            if self.missing.contains(&path) {
                changes.missing_modified.push(path.clone());
            }
            for dir in &self.dirs {
                if path.starts_with(dir) {
                    dirs_hit.insert(dir.clone());
                }
            }
        }

        for dir in dirs_hit {
            changes.dir_timestamps.insert(dir.clone(), modified_or_now(&dir));
            changes.dirs_modified.push(dir);
        }
        changes
    }
}

fn modified_or_now(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or_else(|_| SystemTime::now())
}

fn is_empty(changes: &WatchChanges) -> bool {
    changes.files_modified.is_empty()
        && changes.dirs_modified.is_empty()
        && changes.missing_modified.is_empty()
}

struct NotifyWatching {
    watcher: Option<RecommendedWatcher>,
}

impl Watching for NotifyWatching {
    fn close(&mut self) {
        self.watcher = None;
    }
}

impl WatchFileSystem for NotifyWatchFileSystem {
    fn watch(&self, set: WatchSet, callback: WatchCallback) -> BridgeResult<Box<dyn Watching>> {
        let watched = WatchedPaths::from_set(&set);

        let mut parents: BTreeSet<PathBuf> = BTreeSet::new();
        for file in watched.files.iter().chain(watched.missing.iter()) {
            if let Some(parent) = file.parent() {
                if parent.is_dir() {
                    parents.insert(parent.to_path_buf());
                }
            }
        }
        let dirs: Vec<PathBuf> = watched.dirs.iter().filter(|d| d.is_dir()).cloned().collect();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    let changes = watched.classify(&event.paths);
                    if !is_empty(&changes) {
                        callback(changes);
                    }
                }
                Err(e) => callback(WatchChanges {
                    error: Some(e.to_string()),
                    ..Default::default()
                }),
            },
            Config::default(),
        )
        .map_err(BridgeError::watch)?;

        for parent in &parents {
            watcher
                .watch(parent, RecursiveMode::NonRecursive)
                .map_err(BridgeError::watch)?;
        }
        for dir in &dirs {
            watcher
                .watch(dir, RecursiveMode::Recursive)
                .map_err(BridgeError::watch)?;
        }

        Ok(Box::new(NotifyWatching {
            watcher: Some(watcher),
        }))
    }
}
