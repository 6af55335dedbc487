//! Source/Destination Map
//!
//! Bidirectional index between an emitted file and the source it was emitted
//! from. Rebuilt from compiler write callbacks; in watch mode it is swapped for
//! an empty map at the start of every rebuild cycle.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Emitted path -> source path, indexed both ways
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDestMap {
    by_destination: BTreeMap<PathBuf, PathBuf>,
    by_source: HashMap<PathBuf, PathBuf>,
}

impl SourceDestMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Last write wins for both the destination and the
    /// reverse entry of the source.
    pub fn record(&mut self, destination: impl Into<PathBuf>, source: impl Into<PathBuf>) {
        let destination = destination.into();
        let source = source.into();

        if let Some(previous_source) = self
            .by_destination
            .insert(destination.clone(), source.clone())
        {
            if previous_source != source
                && self.by_source.get(&previous_source) == Some(&destination)
            {
                // Fall back to another output still emitted from that source
                let remaining = self
                    .by_destination
                    .iter()
                    .find(|(_, s)| **s == previous_source)
                    .map(|(d, _)| d.clone());
                match remaining {
                    Some(other) => self.by_source.insert(previous_source, other),
                    None => self.by_source.remove(&previous_source),
                };
            }
        }
        self.by_source.insert(source, destination);
    }

    pub fn source_for(&self, destination: &Path) -> Option<&Path> {
        self.by_destination.get(destination).map(PathBuf::as_path)
    }

    pub fn destination_for(&self, source: &Path) -> Option<&Path> {
        self.by_source.get(source).map(PathBuf::as_path)
    }

    pub fn contains_source(&self, source: &Path) -> bool {
        self.by_source.contains_key(source)
    }

    pub fn contains_destination(&self, destination: &Path) -> bool {
        self.by_destination.contains_key(destination)
    }

    /// Return the current mapping and leave this map empty.
    pub fn snapshot_and_clear(&mut self) -> SourceDestMap {
        std::mem::take(self)
    }

    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        self.by_destination.keys().map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.by_destination
            .iter()
            .map(|(d, s)| (d.as_path(), s.as_path()))
    }

    pub fn len(&self) -> usize {
        self.by_destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_destination.is_empty()
    }
}

/// Files present in `old_files` but absent from `new_files`, in `old_files` order.
pub fn diff_deleted<P: AsRef<Path>>(old_files: &[P], new_files: &[P]) -> Vec<PathBuf> {
    let current: std::collections::HashSet<&Path> =
        new_files.iter().map(|p| p.as_ref()).collect();
    old_files
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !current.contains(p))
        .map(Path::to_path_buf)
        .collect()
}
