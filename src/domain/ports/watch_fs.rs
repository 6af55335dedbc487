//! Watch filesystem port
//!
//! The bundler watches its dependencies through this interface. The watch
//! decorator rewrites lists and change notifications between source and
//! emitted identities on top of any implementation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::BridgeResult;

/// The set of paths a bundler wants watched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    pub files: Vec<PathBuf>,
    pub dirs: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
    pub start_time: Option<SystemTime>,
}

/// One batch of change notifications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchChanges {
    pub error: Option<String>,
    pub files_modified: Vec<PathBuf>,
    pub dirs_modified: Vec<PathBuf>,
    pub missing_modified: Vec<PathBuf>,
    pub file_timestamps: HashMap<PathBuf, SystemTime>,
    pub dir_timestamps: HashMap<PathBuf, SystemTime>,
}

/// Callback invoked with every change batch
pub type WatchCallback = Box<dyn Fn(WatchChanges) + Send + Sync>;

/// An active watch; dropping or closing it stops notifications
pub trait Watching: Send {
    fn close(&mut self);
}

pub trait WatchFileSystem: Send + Sync {
    fn watch(&self, set: WatchSet, callback: WatchCallback) -> BridgeResult<Box<dyn Watching>>;
}
