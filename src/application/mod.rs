//! Application Layer
//!
//! Orchestration on top of the domain ports.
//! This layer:
//! - Depends on the Domain layer (entities, services, ports)
//! - Owns build sessions and their concurrency
//! - Wires infrastructure adapters into bundler hooks
//!
//! ## Modules
//!
//! - `loader` - One bundler request: session lookup, build, read-back
//! - `session` - Per-configuration sessions, build signals, the registry
//! - `watch` - Watch state machine, tracked timers, watch filesystem decorator
//! - `resolve` - Hybrid / native module resolution

pub mod loader;
pub mod resolve;
pub mod session;
pub mod watch;

pub use loader::{LoadTicket, LoaderContext, LoaderOutput, ProjectLoader, PROJECT_FILE_GRACE};
pub use resolve::{create_resolver, ModuleResolver};
pub use session::{
    BuildSignal, ConfigSession, HookKind, SessionKey, SessionManager, SessionRequest,
    SignalCompleter,
};
pub use watch::{ReplaceWatchFileSystem, TrackedTimers, WatchPhase, WatchStateMachine};
