//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//!
//! ## Structure
//!
//! - `fs/` - Local disk host, virtual output store, overlay host
//! - `events/` - Console and NDJSON event sinks
//! - `watch/` - notify-backed watch filesystem

pub mod events;
pub mod fs;
pub mod watch;

// Re-export for convenience
pub use events::{ConsoleEventSink, JsonEventSink};
pub use fs::{LocalFileHost, OverlayFileHost, VirtualOutputStore};
pub use watch::NotifyWatchFileSystem;
