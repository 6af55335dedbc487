//! FileHost port - synchronous filesystem capability
//!
//! The bundler hands us its input filesystem through this trait. It may be
//! backed by the real disk, by the bundler's own cached filesystem, or by the
//! overlay that serves emitted files out of the virtual output store.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::domain::value_objects::paths::normalize;

/// Result type for file host operations
pub type FsResult<T> = Result<T, FsError>;

/// File host operation errors
#[derive(Debug)]
pub enum FsError {
    /// File or directory not found
    NotFound(PathBuf),
    /// Path exists but is not a directory
    NotADirectory(PathBuf),
    /// Content is not valid UTF-8
    InvalidUtf8(PathBuf),
    /// I/O error
    Io(std::io::Error),
    /// Other error
    Other(String),
}

impl FsError {
    /// Attach a path to an I/O error, mapping "not found" to [`FsError::NotFound`].
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_path_buf()),
            _ => FsError::Io(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

impl From<std::io::Error> for FsError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(PathBuf::new()),
            _ => FsError::Io(err),
        }
    }
}

impl std::fmt::Display for FsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FsError::NotFound(path) => write!(f, "File not found: {}", path.display()),
            FsError::NotADirectory(path) => write!(f, "Not a directory: {}", path.display()),
            FsError::InvalidUtf8(path) => write!(f, "File is not valid UTF-8: {}", path.display()),
            FsError::Io(err) => write!(f, "I/O error: {}", err),
            FsError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FsError {}

/// What a path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Result of a `stat` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub kind: EntryKind,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileStat {
    pub fn file(len: u64, modified: Option<SystemTime>) -> Self {
        Self {
            kind: EntryKind::File,
            len,
            modified,
        }
    }

    pub fn directory(modified: Option<SystemTime>) -> Self {
        Self {
            kind: EntryKind::Directory,
            len: 0,
            modified,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Abstract synchronous filesystem
///
/// Implementations:
/// - `LocalFileHost` - the real disk
/// - `OverlayFileHost` - virtual output store layered over another host
pub trait FileHost: Send + Sync {
    /// Stat a path
    fn stat(&self, path: &Path) -> FsResult<FileStat>;

    /// Read raw file content
    fn read(&self, path: &Path) -> FsResult<Vec<u8>>;

    /// List entry names (not full paths) of a directory
    fn read_dir(&self, path: &Path) -> FsResult<Vec<String>>;

    /// Read file content as UTF-8
    fn read_to_string(&self, path: &Path) -> FsResult<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|_| FsError::InvalidUtf8(path.to_path_buf()))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.stat(path).map(|s| s.is_file()).unwrap_or(false)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.stat(path).map(|s| s.is_dir()).unwrap_or(false)
    }

    /// Join a request onto a base path
    fn join(&self, base: &Path, request: &str) -> PathBuf {
        normalize(&base.join(request))
    }

    /// Canonical form of a path as seen by this host
    fn normalize(&self, path: &Path) -> PathBuf {
        normalize(path)
    }
}
