//! Include/exclude pattern sets
//!
//! Matches `include`/`exclude` entries of a tsconfig using gitignore
//! semantics from the `ignore` crate. A pattern naming a directory matches
//! everything below it.

use std::fmt;
use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Patterns used when a config has no `include`
pub const DEFAULT_INCLUDE: &[&str] = &["**/*"];

/// Directories excluded when a config has no `exclude`
pub const DEFAULT_EXCLUDE: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

/// A compiled pattern set rooted at one directory.
#[derive(Debug)]
pub struct FilePatterns {
    matcher: Gitignore,
    pattern_count: usize,
}

impl FilePatterns {
    /// Compile `patterns` relative to `root`.
    pub fn new<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Self, PatternError> {
        let mut builder = GitignoreBuilder::new(root);
        let mut pattern_count = 0;

        for pattern in patterns {
            let trimmed = pattern.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            // "./src" and "src" mean the same thing in a tsconfig
            let line = trimmed.trim_start_matches("./");
            builder
                .add_line(None, line)
                .map_err(|e| PatternError::Invalid {
                    pattern: trimmed.to_string(),
                    message: e.to_string(),
                })?;
            pattern_count += 1;
        }

        let matcher = builder
            .build()
            .map_err(|e| PatternError::BuildFailed(e.to_string()))?;

        Ok(Self {
            matcher,
            pattern_count,
        })
    }

    /// Whether `path` (absolute, or relative to the root) or one of its
    /// parents matches.
    pub fn matches(&self, path: &Path, is_dir: bool) -> bool {
        if self.pattern_count == 0 {
            return false;
        }
        if path.is_absolute() && !path.starts_with(self.matcher.path()) {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_count == 0
    }
}

/// Errors compiling a pattern set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    Invalid { pattern: String, message: String },
    BuildFailed(String),
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::Invalid { pattern, message } => {
                write!(f, "invalid pattern '{}': {}", pattern, message)
            }
            PatternError::BuildFailed(message) => {
                write!(f, "failed to build pattern matcher: {}", message)
            }
        }
    }
}

impl std::error::Error for PatternError {}
