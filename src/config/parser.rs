//! tsconfig parsing
//!
//! [`ConfigParser`] is the seam the compiler's own config handling plugs into.
//! [`JsonConfigParser`] is the built-in implementation: it reads the file
//! through a [`FileHost`], tolerates comments and trailing commas, follows
//! path-based `extends`, and expands `files`/`include`/`exclude` into the root
//! file list. Package-name `extends` needs a parser backed by the compiler.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::ports::file_host::FileHost;
use crate::domain::value_objects::paths::{append_suffix, has_suffix, resolve};
use crate::domain::value_objects::{
    CompilerOptions, FilePatterns, PatternError, DEFAULT_EXCLUDE, DEFAULT_INCLUDE,
};
use crate::error::{BridgeError, BridgeResult};

/// Extensions always accepted as root files
pub const TS_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".mts", ".cts"];

/// Extensions additionally accepted with `allowJs`
pub const JS_EXTENSIONS: &[&str] = &[".js", ".jsx", ".mjs", ".cjs"];

/// Compiler options plus the expanded root files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedConfig {
    pub options: CompilerOptions,
    pub file_names: Vec<PathBuf>,
}

/// Parses compiler configuration
pub trait ConfigParser: Send + Sync {
    /// Parse the config file at `path`.
    fn parse_file(&self, host: &dyn FileHost, path: &Path) -> BridgeResult<ParsedConfig>;

    /// Parse an empty configuration rooted at `base`.
    fn parse_default(&self, host: &dyn FileHost, base: &Path) -> BridgeResult<ParsedConfig>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    compiler_options: CompilerOptions,
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    extends: Option<serde_json::Value>,
}

/// Built-in tsconfig.json parser
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConfigParser;

impl JsonConfigParser {
    pub fn new() -> Self {
        Self
    }

    fn expand(
        &self,
        host: &dyn FileHost,
        config_path: Option<&Path>,
        config_dir: &Path,
        raw: RawConfig,
    ) -> BridgeResult<ParsedConfig> {
        let invalid = |message: String| BridgeError::InvalidConfig {
            path: config_path.map(Path::to_path_buf),
            message,
        };

        let mut options = raw.compiler_options;
        resolve_option_paths(&mut options, config_dir);

        let mut file_names: Vec<PathBuf> = Vec::new();
        let mut seen: BTreeSet<PathBuf> = BTreeSet::new();

        if let Some(files) = &raw.files {
            for file in files {
                let path = resolve(config_dir, Path::new(file));
                if seen.insert(path.clone()) {
                    file_names.push(path);
                }
            }
        }

        let include: Vec<String> = match (&raw.include, &raw.files) {
            (Some(include), _) => include.clone(),
            (None, Some(_)) => Vec::new(),
            (None, None) => DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect(),
        };

        if !include.is_empty() {
            let mut exclude: Vec<String> = raw.exclude.clone().unwrap_or_else(|| {
                DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect()
            });
            if raw.exclude.is_none() {
                if let Some(out_dir) = &options.out_dir {
                    if let Ok(rel) = out_dir.strip_prefix(config_dir) {
                        exclude.push(format!("/{}", rel.display()));
                    }
                }
            }

            let pattern_err = |e: PatternError| invalid(e.to_string());
            let include = FilePatterns::new(config_dir, &include).map_err(pattern_err)?;
            let exclude = FilePatterns::new(config_dir, &exclude).map_err(pattern_err)?;
            let allow_js = options.allows_js();

            let mut found = Vec::new();
            walk(host, config_dir, &include, &exclude, allow_js, &mut found);
            for path in found {
                if seen.insert(path.clone()) {
                    file_names.push(path);
                }
            }
        }

        Ok(ParsedConfig {
            options,
            file_names,
        })
    }
}

impl JsonConfigParser {
    /// Read one config file and fold in whatever it extends. Path options
    /// come back absolute, relative to the file that set them.
    fn read_raw(
        &self,
        host: &dyn FileHost,
        path: &Path,
        chain: &mut Vec<PathBuf>,
    ) -> BridgeResult<RawConfig> {
        let invalid = |message: String| BridgeError::InvalidConfig {
            path: Some(path.to_path_buf()),
            message,
        };

        let content = host.read_to_string(path)?;
        let cleaned = strip_json_comments(&content);
        let mut raw: RawConfig = if cleaned.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_json::from_str(&cleaned).map_err(|e| invalid(e.to_string()))?
        };
        let config_dir = path.parent().unwrap_or_else(|| Path::new("/"));
        resolve_option_paths(&mut raw.compiler_options, config_dir);

        let bases: Vec<String> = match raw.extends.take() {
            None => Vec::new(),
            Some(serde_json::Value::String(base)) => vec![base],
            Some(serde_json::Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(base) => Ok(base),
                    other => Err(invalid(format!("invalid 'extends' entry: {}", other))),
                })
                .collect::<BridgeResult<_>>()?,
            Some(other) => return Err(invalid(format!("invalid 'extends': {}", other))),
        };

        chain.push(path.to_path_buf());
        let mut options = CompilerOptions::default();
        for base in bases {
            let base_path = extends_target(host, config_dir, &base)
                .ok_or_else(|| invalid(format!("'extends' of package '{}' is not supported", base)))?;
            if chain.contains(&base_path) {
                return Err(invalid(format!("circular 'extends': {}", base_path.display())));
            }
            let parent = self.read_raw(host, &base_path, chain)?;
            let parent_dir = base_path.parent().unwrap_or_else(|| Path::new("/"));

            options = options.merged_with(&parent.compiler_options);
            if raw.files.is_none() {
                raw.files = parent.files.map(|files| {
                    files
                        .iter()
                        .map(|f| resolve(parent_dir, Path::new(f)).display().to_string())
                        .collect()
                });
            }
            // Patterns only carry over between configs in one directory
            if parent_dir == config_dir {
                if raw.include.is_none() {
                    raw.include = parent.include;
                }
                if raw.exclude.is_none() {
                    raw.exclude = parent.exclude;
                }
            }
        }
        chain.pop();

        raw.compiler_options = options.merged_with(&raw.compiler_options);
        Ok(raw)
    }
}

/// Absolute path of a relative or absolute `extends` entry; `None` for
/// package names.
fn extends_target(host: &dyn FileHost, config_dir: &Path, base: &str) -> Option<PathBuf> {
    let is_path = base.starts_with("./") || base.starts_with("../") || Path::new(base).is_absolute();
    if !is_path {
        return None;
    }
    let target = resolve(config_dir, Path::new(base));
    if !host.is_file(&target) && !has_suffix(&target, ".json") {
        return Some(append_suffix(&target, ".json"));
    }
    Some(target)
}

fn resolve_option_paths(options: &mut CompilerOptions, config_dir: &Path) {
    for dir in [
        &mut options.out_dir,
        &mut options.root_dir,
        &mut options.declaration_dir,
    ]
    .into_iter()
    .flatten()
    {
        *dir = resolve(config_dir, dir);
    }
}

impl ConfigParser for JsonConfigParser {
    fn parse_file(&self, host: &dyn FileHost, path: &Path) -> BridgeResult<ParsedConfig> {
        let raw = self.read_raw(host, path, &mut Vec::new())?;
        let config_dir = path.parent().unwrap_or_else(|| Path::new("/"));
        self.expand(host, Some(path), config_dir, raw)
    }

    fn parse_default(&self, host: &dyn FileHost, base: &Path) -> BridgeResult<ParsedConfig> {
        self.expand(host, None, base, RawConfig::default())
    }
}

/// Whether a root file with this name is compiled under the given `allowJs`.
pub fn is_supported_source(path: &Path, allow_js: bool) -> bool {
    TS_EXTENSIONS.iter().any(|ext| has_suffix(path, ext))
        || (allow_js && JS_EXTENSIONS.iter().any(|ext| has_suffix(path, ext)))
}

fn walk(
    host: &dyn FileHost,
    dir: &Path,
    include: &FilePatterns,
    exclude: &FilePatterns,
    allow_js: bool,
    found: &mut Vec<PathBuf>,
) {
    let Ok(mut entries) = host.read_dir(dir) else {
        return;
    };
    entries.sort();

    for name in entries {
        let path = dir.join(&name);
        if host.is_dir(&path) {
            if !exclude.matches(&path, true) {
                walk(host, &path, include, exclude, allow_js, found);
            }
            continue;
        }
        if is_supported_source(&path, allow_js)
            && include.matches(&path, false)
            && !exclude.matches(&path, false)
        {
            found.push(path);
        }
    }
}

/// Remove `//` and `/* */` comments and trailing commas, leaving string
/// literals untouched.
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
            }
            '}' | ']' => {
                drop_trailing_comma(&mut out);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn drop_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.remove(trimmed_len - 1);
    }
}
