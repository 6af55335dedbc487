//! Compiler configuration discovery and loading

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::ports::file_host::FileHost;
use crate::domain::value_objects::paths::{normalize, resolve};
use crate::domain::value_objects::{CompilerOptions, ModuleKind};
use crate::error::{BridgeError, BridgeResult};
use crate::infrastructure::fs::VirtualOutputStore;

use super::parser::ConfigParser;

/// Name searched for when no explicit config name is given
pub const DEFAULT_CONFIG_NAME: &str = "tsconfig.json";

/// Where the compiler's output lands
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// A private in-memory root
    Virtual(Arc<VirtualOutputStore>),
    /// A real directory (`tempBuildDir`)
    Disk(PathBuf),
}

impl OutputTarget {
    pub fn out_dir(&self) -> &Path {
        match self {
            OutputTarget::Virtual(store) => store.root(),
            OutputTarget::Disk(dir) => dir,
        }
    }

    pub fn store(&self) -> Option<&Arc<VirtualOutputStore>> {
        match self {
            OutputTarget::Virtual(store) => Some(store),
            OutputTarget::Disk(_) => None,
        }
    }
}

/// Inputs to [`load_config_file`] that come from the loader request
#[derive(Debug, Clone, Default)]
pub struct LoadSettings {
    /// Directory searched when there is no config file
    pub base_path: PathBuf,
    pub source_map: bool,
    pub temp_build_dir: Option<PathBuf>,
    pub overrides: Option<CompilerOptions>,
}

/// A fully resolved compiler configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub config_file: Option<PathBuf>,
    pub config_directory: PathBuf,
    /// Parsed options with every override applied
    pub options: CompilerOptions,
    /// Only the overrides (including the output root and `sourceMap`)
    pub extended_options: CompilerOptions,
    pub root_files: Vec<PathBuf>,
    pub output: OutputTarget,
}

impl BuildConfig {
    pub fn out_dir(&self) -> &Path {
        self.output.out_dir()
    }
}

/// Locate the config file for a request.
///
/// `name` may be a file name, a path, or a directory (trailing separator or
/// an existing directory). The search walks from the starting directory up
/// to the filesystem root. Returns `Ok(None)` when no name was given and
/// nothing was found.
pub fn find_config_file(
    host: &dyn FileHost,
    from: &Path,
    name: Option<&str>,
) -> BridgeResult<Option<PathBuf>> {
    let mut search_path = normalize(from);
    let mut config_name = DEFAULT_CONFIG_NAME.to_string();

    if let Some(name) = name {
        let target = resolve(from, Path::new(name));
        let names_dir = name.ends_with('/') || name.ends_with('\\') || host.is_dir(&target);
        if names_dir {
            search_path = target;
        } else {
            if let Some(parent) = target.parent() {
                search_path = parent.to_path_buf();
            }
            if let Some(file_name) = target.file_name() {
                config_name = file_name.to_string_lossy().into_owned();
            }
        }
    }

    for ancestor in search_path.ancestors() {
        let candidate = ancestor.join(&config_name);
        if host.is_file(&candidate) {
            return Ok(Some(candidate));
        }
    }

    match name {
        Some(name) => Err(BridgeError::ConfigNotFound {
            name: name.to_string(),
        }),
        None => Ok(None),
    }
}

/// Reject options that would bundle all output into a single file.
pub fn validate_compiler_options(options: &CompilerOptions) -> BridgeResult<()> {
    match options.bundling_option() {
        Some(option) => Err(BridgeError::UnsupportedOption {
            option: option.to_string(),
        }),
        None => Ok(()),
    }
}

/// Read and resolve a configuration.
///
/// Without a config file the base path becomes `rootDir` and modules are
/// emitted as ES2015. The output root is always replaced by the private
/// store root (or `tempBuildDir`), and `sourceMap` follows the request.
pub fn load_config_file(
    host: &dyn FileHost,
    parser: &dyn ConfigParser,
    config_file: Option<&Path>,
    settings: &LoadSettings,
) -> BridgeResult<BuildConfig> {
    let (config_directory, mut parsed) = match config_file {
        Some(path) => {
            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("/"));
            (dir, parser.parse_file(host, path)?)
        }
        None => {
            let dir = normalize(&settings.base_path);
            let parsed = parser.parse_default(host, &dir)?;
            (dir, parsed)
        }
    };

    if config_file.is_none() {
        parsed.options.root_dir = Some(config_directory.clone());
        parsed.options.module = Some(ModuleKind::Es2015);
    } else if let Some(root_dir) = &parsed.options.root_dir {
        parsed.options.root_dir = Some(resolve(&config_directory, root_dir));
    }
    validate_compiler_options(&parsed.options)?;

    let mut extended = settings.overrides.clone().unwrap_or_default();
    if settings.overrides.is_some() {
        validate_compiler_options(&extended)?;
        if let Some(root_dir) = &extended.root_dir {
            extended.root_dir = Some(resolve(&config_directory, root_dir));
        }
    }

    let output = match &settings.temp_build_dir {
        Some(dir) => OutputTarget::Disk(resolve(&config_directory, dir)),
        None => OutputTarget::Virtual(Arc::new(VirtualOutputStore::new())),
    };
    extended.out_dir = Some(output.out_dir().to_path_buf());
    extended.source_map = Some(settings.source_map);

    Ok(BuildConfig {
        config_file: config_file.map(Path::to_path_buf),
        config_directory,
        options: parsed.options.merged_with(&extended),
        extended_options: extended,
        root_files: parsed.file_names,
        output,
    })
}
