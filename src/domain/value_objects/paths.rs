//! Lexical path helpers
//!
//! Every path that crosses the map, the store, or the compiler host is put
//! through [`normalize`] first so that lookups compare like with like. None of
//! these helpers touch the filesystem.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Collapse `.` and `..` components without consulting the filesystem.
///
/// `..` at the root of an absolute path is dropped; leading `..` on a
/// relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Resolve `path` against `base` (when relative) and normalise.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Whether `target` lies inside (or is) `base`.
pub fn is_child_path(base: &Path, target: &Path) -> bool {
    normalize(target).starts_with(normalize(base))
}

/// Relative path from `from` to `to`, using `..` where needed.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);
    let from_parts: Vec<_> = from.components().collect();
    let to_parts: Vec<_> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for part in &from_parts[common..] {
        if !matches!(part, Component::CurDir) {
            rel.push("..");
        }
    }
    for part in &to_parts[common..] {
        rel.push(part.as_os_str());
    }
    rel
}

/// Replace the final extension. `a.d.ts` keeps its `.d` part, matching how
/// the compiler derives output names.
pub fn with_extension(path: &Path, ext: &str) -> PathBuf {
    let mut out = path.to_path_buf();
    out.set_extension(ext.trim_start_matches('.'));
    out
}

/// Append a suffix to the file name (`a.js` + `.map` -> `a.js.map`).
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Case-insensitive file-name suffix test.
pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.to_string_lossy()
        .to_ascii_lowercase()
        .ends_with(&suffix.to_ascii_lowercase())
}
