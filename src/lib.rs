//! tsbridge - compile-on-demand bridge between a bundler and a type-checking compiler
//!
//! The bundler asks for one source file at a time; tsbridge runs the compiler
//! once per configuration (or keeps one watch loop alive), captures the
//! emitted files in a private in-memory store, and hands each request its
//! emitted output.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-exports for convenience
pub use application::{
    BuildSignal, ConfigSession, LoaderContext, LoaderOutput, ProjectLoader, SessionManager,
};
pub use config::{find_config_file, load_config_file, JsonConfigParser, LoaderOptions};
pub use domain::entities::SourceDestMap;
pub use domain::ports::{BuildEvent, BuildEventSink, BundlerCompiler, CompilerEngine, FileHost};
pub use error::{BridgeError, BridgeResult};
pub use infrastructure::fs::{LocalFileHost, OverlayFileHost, VirtualOutputStore};
