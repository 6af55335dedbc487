//! Error types for tsbridge
//!
//! Uses `thiserror` for library errors. The binary wraps these in `anyhow`.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::ports::compiler::Diagnostic;
use crate::domain::ports::file_host::FsError;

/// Result type alias for tsbridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Main error type for tsbridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// An explicitly requested config file could not be located
    #[error("could not find a valid tsconfig.json from name '{name}'")]
    ConfigNotFound { name: String },

    /// Both `configFile` and `configFileName` were given
    #[error("both 'configFile' and 'configFileName' cannot be specified")]
    ConflictingOptions,

    /// A compiler option that cannot work with per-file loading
    #[error("option '{option}' is not supported: bundling emitted files is not supported with the loader")]
    UnsupportedOption { option: String },

    /// Malformed configuration file
    #[error("invalid configuration in {}: {message}", display_config_path(.path))]
    InvalidConfig {
        path: Option<PathBuf>,
        message: String,
    },

    /// One-shot compilation reported diagnostics
    #[error("{}", join_diagnostics(.diagnostics))]
    Compilation { diagnostics: Vec<Diagnostic> },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem host error
    #[error("{0}")]
    Fs(#[from] FsError),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Watcher could not be installed
    #[error("watch error: {message}")]
    Watch { message: String },

    /// The compiler engine panicked or failed outside of diagnostics
    #[error("compiler engine failed: {message}")]
    Engine { message: String },

    /// A pending build signal was replaced before it completed
    #[error("build was superseded by a newer rebuild cycle")]
    Superseded,

    /// A failure shared between every waiter of one build signal
    #[error(transparent)]
    Shared(Arc<BridgeError>),
}

impl BridgeError {
    /// Wrap a notify error raised while installing a watcher.
    pub fn watch(err: impl std::fmt::Display) -> Self {
        BridgeError::Watch {
            message: err.to_string(),
        }
    }

    /// Whether a caller should re-read the session signal and wait again.
    pub fn is_superseded(&self) -> bool {
        match self {
            BridgeError::Superseded => true,
            BridgeError::Shared(inner) => inner.is_superseded(),
            _ => false,
        }
    }
}

fn display_config_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<default configuration>".to_string(),
    }
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "compilation failed".to_string();
    }
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
