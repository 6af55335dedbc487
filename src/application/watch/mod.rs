//! Watch mode
//!
//! - `WatchStateMachine` - turns compiler status codes into rebuild cycles
//! - `TrackedTimers` - timer host whose timers all die with the watch
//! - `ReplaceWatchFileSystem` - bundler watch filesystem speaking source paths
//!   while the outputs change underneath

mod state;
mod timers;
mod watch_fs;


pub use state::{CycleHooks, WatchPhase, WatchStateMachine};
pub use timers::TrackedTimers;
pub use watch_fs::{OutputTranslator, ReplaceWatchFileSystem};
