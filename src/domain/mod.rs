//! Domain Layer
//!
//! Pure types and the ports the orchestration layer talks through.
//!
//! ## Structure
//!
//! - `entities/` - Source/destination map
//! - `value_objects/` - Compiler options, lexical path helpers
//! - `services/` - Source <-> emitted path translation
//! - `ports/` - Interfaces for the compiler, bundler, filesystems and events
//!
//! Nothing in this layer touches the real filesystem.

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
