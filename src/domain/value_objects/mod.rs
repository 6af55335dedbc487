//! Value Objects

pub mod compiler_options;
pub mod file_patterns;
pub mod paths;

pub use compiler_options::{CompilerOptions, ModuleKind};
pub use file_patterns::{FilePatterns, PatternError, DEFAULT_EXCLUDE, DEFAULT_INCLUDE};
