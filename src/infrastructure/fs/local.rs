//! Local File Host Implementation
//!
//! Implements the FileHost port for the real disk. Also used to write
//! emitted files when a `tempBuildDir` replaces the virtual store.

use std::path::Path;

use crate::domain::ports::file_host::{FileHost, FileStat, FsError, FsResult};

/// Local disk file host
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileHost;

impl LocalFileHost {
    pub fn new() -> Self {
        Self
    }

    /// Write a file, creating parent directories as needed
    pub fn write(&self, path: &Path, content: &[u8]) -> FsResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FsError::from_io(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| FsError::from_io(path, e))
    }
}

impl FileHost for LocalFileHost {
    fn stat(&self, path: &Path) -> FsResult<FileStat> {
        let meta = std::fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;
        let modified = meta.modified().ok();
        if meta.is_dir() {
            Ok(FileStat::directory(modified))
        } else {
            Ok(FileStat::file(meta.len(), modified))
        }
    }

    fn read(&self, path: &Path) -> FsResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| FsError::from_io(path, e))
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<String>> {
        let entries = std::fs::read_dir(path).map_err(|e| FsError::from_io(path, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FsError::from_io(path, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
