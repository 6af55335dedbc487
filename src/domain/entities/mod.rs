//! Domain Entities

pub mod source_dest_map;

pub use source_dest_map::{diff_deleted, SourceDestMap};
