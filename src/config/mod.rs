//! Configuration
//!
//! Two layers:
//! 1. Loader options, supplied by the bundler (JSON) or a TOML file
//! 2. Compiler configuration, found by walking up from the request to a
//!    `tsconfig.json` and expanded into options plus root files

mod loader;
mod parser;
mod project;
mod types;

pub use loader::{load_options_with_warnings, OptionWarning};
pub use parser::{
    is_supported_source, strip_json_comments, ConfigParser, JsonConfigParser, ParsedConfig,
    JS_EXTENSIONS, TS_EXTENSIONS,
};
pub use project::{
    find_config_file, load_config_file, validate_compiler_options, BuildConfig, LoadSettings,
    OutputTarget, DEFAULT_CONFIG_NAME,
};
pub use types::{LoaderOptions, ResolverStrategy};
