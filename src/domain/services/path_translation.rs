//! Source <-> emitted path translation
//!
//! The map is authoritative. When it has no entry (a file the current cycle
//! did not rewrite, or a request that arrives before any write) the path is
//! transposed between the output root and the project base root. The
//! transposition is best effort: with a non-default `declarationDir`/`rootDir`
//! layout it can disagree with what the compiler actually emitted.

use std::path::{Path, PathBuf};

use crate::domain::entities::SourceDestMap;
use crate::domain::value_objects::paths::{normalize, relative_path, resolve, with_extension};
use crate::domain::value_objects::CompilerOptions;

/// Output extension the compiler picks for a source extension
pub fn emitted_extension(source: &Path) -> &'static str {
    match source.extension().and_then(|e| e.to_str()) {
        Some("mts") => "mjs",
        Some("cts") => "cjs",
        _ => "js",
    }
}

/// Source extensions that emit to `emitted`, most likely first
pub fn source_extensions(emitted: &Path) -> &'static [&'static str] {
    match emitted.extension().and_then(|e| e.to_str()) {
        Some("mjs") => &["mts"],
        Some("cjs") => &["cts"],
        Some("jsx") => &["tsx"],
        _ => &["ts", "tsx"],
    }
}

/// Directory that emitted paths are laid out relative to.
///
/// `rootDir` when configured, otherwise the compiler's common source
/// directory, otherwise the directory holding the config file.
pub fn base_path(
    options: &CompilerOptions,
    common_source_directory: Option<&Path>,
    config_directory: &Path,
) -> PathBuf {
    options
        .root_dir
        .as_deref()
        .or(common_source_directory)
        .unwrap_or(config_directory)
        .to_path_buf()
}

/// Snapshot of the session state translation needs
#[derive(Debug, Clone, Copy)]
pub struct TranslationContext<'a> {
    pub map: &'a SourceDestMap,
    pub base_path: &'a Path,
    pub out_dir: &'a Path,
    pub root_files: &'a [PathBuf],
}

impl<'a> TranslationContext<'a> {
    /// Emitted path for a source file.
    pub fn to_emitted_path(&self, source: &Path) -> PathBuf {
        let actual = resolve(self.base_path, source);
        if let Some(destination) = self.map.destination_for(&actual) {
            return destination.to_path_buf();
        }
        let relative = relative_path(self.base_path, &actual);
        normalize(&self.out_dir.join(with_extension(&relative, emitted_extension(&actual))))
    }

    /// Source path for an emitted file.
    pub fn to_source_path(&self, emitted: &Path) -> PathBuf {
        let actual = normalize(emitted);
        if let Some(source) = self.map.source_for(&actual) {
            return source.to_path_buf();
        }
        let relative = normalize(&self.base_path.join(relative_path(self.out_dir, &actual)));
        let candidates: Vec<PathBuf> = source_extensions(&actual)
            .iter()
            .map(|ext| with_extension(&relative, ext))
            .collect();

        candidates
            .iter()
            .find(|c| self.root_files.iter().any(|f| normalize(f) == **c))
            .unwrap_or(&candidates[0])
            .clone()
    }

    /// Whether `path` is one of the project's sources.
    pub fn is_project_source_file(&self, path: &Path) -> bool {
        is_project_source_file(self.map, self.root_files, path)
    }
}

/// A file belongs to the project if the map knows it as a source or it is
/// one of the root files.
pub fn is_project_source_file(map: &SourceDestMap, root_files: &[PathBuf], path: &Path) -> bool {
    let path = normalize(path);
    if map.contains_source(&path) {
        return true;
    }
    root_files.iter().any(|f| normalize(f) == path)
}
