//! Loader option loading

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BridgeError, BridgeResult};

use super::types::LoaderOptions;

/// Non-fatal option warning (e.g. an unknown key)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

/// Load options from TOML and collect unknown keys as warnings.
pub fn load_options_with_warnings(path: &Path) -> BridgeResult<(LoaderOptions, Vec<OptionWarning>)> {
    let content = fs::read_to_string(path)?;
    parse_options_with_warnings(&content, path)
}

pub(crate) fn parse_options_with_warnings(
    content: &str,
    path: &Path,
) -> BridgeResult<(LoaderOptions, Vec<OptionWarning>)> {
    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(content);

    let options: LoaderOptions = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| BridgeError::InvalidConfig {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .filter(|p| !p.starts_with("compilerOptions."))
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            OptionWarning {
                key: key.clone(),
                file: path.to_path_buf(),
                line: find_line_number(content, &key),
                suggestion: suggest_key(&key),
            }
        })
        .collect();

    Ok((options, warnings))
}

/// Option names known to the loader, for typo suggestions
const KNOWN_KEYS: &[&str] = &[
    "configFile",
    "configFileName",
    "tempBuildDir",
    "locale",
    "silent",
    "verbose",
    "showVersion",
    "useTsModuleResolution",
    "compilerOptions",
];

/// Line (1-based) where `key` is assigned or opens a table.
fn find_line_number(content: &str, key: &str) -> Option<usize> {
    content.lines().position(|line| {
        let line = line.trim_start();
        let name = line.trim_start_matches('[').trim_start_matches('"');
        name.strip_prefix(key)
            .map(|rest| {
                let rest = rest.trim_start_matches('"').trim_start();
                rest.starts_with('=') || rest.starts_with(']')
            })
            .unwrap_or(false)
    })
    .map(|i| i + 1)
}

/// Closest known key within two edits, ignoring ASCII case.
fn suggest_key(unknown: &str) -> Option<String> {
    let unknown = unknown.to_ascii_lowercase();
    KNOWN_KEYS
        .iter()
        .map(|known| (*known, edit_distance(&unknown, &known.to_ascii_lowercase())))
        .filter(|(_, distance)| *distance <= 2)
        .min_by_key(|(_, distance)| *distance)
        .map(|(known, _)| known.to_string())
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = diagonal + usize::from(ca != *cb);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(row[j + 1] + 1);
        }
    }
    row[b.len()]
}
