//! Compiler option set
//!
//! Only the options this crate reads are typed. Everything else in
//! `compilerOptions` is preserved untouched in `other` and handed back to the
//! compiler engine.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Module code generation kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKind {
    None,
    CommonJs,
    Amd,
    Umd,
    System,
    Es2015,
    Es2020,
    Es2022,
    EsNext,
    Node16,
    NodeNext,
    Preserve,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::None => "None",
            ModuleKind::CommonJs => "CommonJS",
            ModuleKind::Amd => "AMD",
            ModuleKind::Umd => "UMD",
            ModuleKind::System => "System",
            ModuleKind::Es2015 => "ES2015",
            ModuleKind::Es2020 => "ES2020",
            ModuleKind::Es2022 => "ES2022",
            ModuleKind::EsNext => "ESNext",
            ModuleKind::Node16 => "Node16",
            ModuleKind::NodeNext => "NodeNext",
            ModuleKind::Preserve => "Preserve",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(ModuleKind::None),
            "commonjs" => Ok(ModuleKind::CommonJs),
            "amd" => Ok(ModuleKind::Amd),
            "umd" => Ok(ModuleKind::Umd),
            "system" => Ok(ModuleKind::System),
            "es6" | "es2015" => Ok(ModuleKind::Es2015),
            "es2020" => Ok(ModuleKind::Es2020),
            "es2022" => Ok(ModuleKind::Es2022),
            "esnext" => Ok(ModuleKind::EsNext),
            "node16" => Ok(ModuleKind::Node16),
            "nodenext" => Ok(ModuleKind::NodeNext),
            "preserve" => Ok(ModuleKind::Preserve),
            other => Err(format!("unknown module kind '{}'", other)),
        }
    }
}

impl Serialize for ModuleKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ModuleKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Options passed to the compiler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_js: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Options passed through to the engine as-is
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl CompilerOptions {
    /// Overlay every option set in `overrides` on top of `self`.
    pub fn merged_with(&self, overrides: &CompilerOptions) -> CompilerOptions {
        let mut merged = self.clone();
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(
                    if overrides.$field.is_some() {
                        merged.$field = overrides.$field.clone();
                    }
                )*
            };
        }
        overlay!(
            out_dir,
            root_dir,
            out_file,
            out,
            declaration,
            declaration_dir,
            source_map,
            allow_js,
            module,
            locale
        );
        for (key, value) in &overrides.other {
            merged.other.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Name of the first option that would bundle all output into one file.
    pub fn bundling_option(&self) -> Option<&'static str> {
        if self.out_file.is_some() {
            Some("outFile")
        } else if self.out.is_some() {
            Some("out")
        } else {
            None
        }
    }

    pub fn allows_js(&self) -> bool {
        self.allow_js.unwrap_or(false)
    }

    pub fn emits_source_map(&self) -> bool {
        self.source_map.unwrap_or(false)
    }

    pub fn emits_declarations(&self) -> bool {
        self.declaration.unwrap_or(false)
    }
}
