//! Domain Services

pub mod path_translation;

pub use path_translation::{base_path, is_project_source_file, TranslationContext};
