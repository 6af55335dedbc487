//! Watch filesystem implementations

mod notify_fs;

pub use notify_fs::NotifyWatchFileSystem;
