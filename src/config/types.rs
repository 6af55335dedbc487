//! Loader option type definitions

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::CompilerOptions;
use crate::error::{BridgeError, BridgeResult};

use super::loader::{self, OptionWarning};

/// How module names are resolved for the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverStrategy {
    /// Bundler resolver first, reconciled with the compiler's resolver
    #[default]
    Hybrid,
    /// Compiler's own resolver only
    NativeOnly,
}

/// Options the bundler passes to the loader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderOptions {
    /// Config file or directory; searched upward from the source file when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,

    /// Alias of `configFile`; specifying both is an error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file_name: Option<String>,

    /// Emit to this directory on disk instead of the virtual store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_build_dir: Option<PathBuf>,

    /// Locale for compiler messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    #[serde(default)]
    pub silent: bool,

    #[serde(default)]
    pub verbose: bool,

    /// Report the loader version when a session is first created
    #[serde(default)]
    pub show_version: bool,

    /// Resolve modules with the compiler's resolver only
    #[serde(default)]
    pub use_ts_module_resolution: bool,

    /// Overrides applied on top of the config file's compiler options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler_options: Option<CompilerOptions>,
}

impl LoaderOptions {
    /// Load from a TOML file
    pub fn load(path: &Path) -> BridgeResult<Self> {
        Ok(loader::load_options_with_warnings(path)?.0)
    }

    /// Load from a TOML file and collect unknown-key warnings
    pub fn load_with_warnings(path: &Path) -> BridgeResult<(Self, Vec<OptionWarning>)> {
        loader::load_options_with_warnings(path)
    }

    /// Parse the JSON form a bundler configuration carries
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.config_file.is_some() && self.config_file_name.is_some() {
            return Err(BridgeError::ConflictingOptions);
        }
        Ok(())
    }

    /// Explicit config name, whichever spelling was used
    pub fn config_name(&self) -> Option<&str> {
        self.config_file
            .as_deref()
            .or(self.config_file_name.as_deref())
    }

    pub fn resolver_strategy(&self) -> ResolverStrategy {
        if self.use_ts_module_resolution {
            ResolverStrategy::NativeOnly
        } else {
            ResolverStrategy::Hybrid
        }
    }
}
