//! Module resolution bridge
//!
//! Reconciles the bundler's resolver with the compiler's. In hybrid mode the
//! bundler gets the first say, limited to files the compiler can load; the
//! compiler's answer replaces it when the bundler found nothing, when both
//! agree, or when the compiler found a declaration file for a script the
//! bundler picked.

use std::path::Path;
use std::sync::Arc;

use crate::config::{is_supported_source, ResolverStrategy, JS_EXTENSIONS};
use crate::domain::ports::resolver::{
    ExternalResolver, NativeResolver, ResolutionCache, ResolvedModule,
};
use crate::domain::value_objects::paths::{has_suffix, normalize};
use crate::domain::value_objects::CompilerOptions;

const DECLARATION_EXTENSIONS: &[&str] = &[".d.ts", ".d.mts", ".d.cts"];

/// Resolver for one program: fixed options and a fresh cache
pub struct ModuleResolver {
    strategy: ResolverStrategy,
    options: CompilerOptions,
    native: Arc<dyn NativeResolver>,
    external: Option<Arc<dyn ExternalResolver>>,
    cache: ResolutionCache,
}

/// Build a resolver for `options`.
///
/// `external` is ignored under [`ResolverStrategy::NativeOnly`]; without it
/// the hybrid strategy degrades to native-only.
pub fn create_resolver(
    strategy: ResolverStrategy,
    options: CompilerOptions,
    native: Arc<dyn NativeResolver>,
    external: Option<Arc<dyn ExternalResolver>>,
    cache: ResolutionCache,
) -> ModuleResolver {
    ModuleResolver {
        strategy,
        options,
        native,
        external,
        cache,
    }
}

impl ModuleResolver {
    pub fn strategy(&self) -> ResolverStrategy {
        self.strategy
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// One result per name, in input order.
    pub fn resolve(
        &self,
        module_names: &[String],
        containing_file: &Path,
    ) -> Vec<Option<ResolvedModule>> {
        module_names
            .iter()
            .map(|name| self.resolve_one(name, containing_file))
            .collect()
    }

    fn resolve_one(&self, module_name: &str, containing_file: &Path) -> Option<ResolvedModule> {
        let external = match (self.strategy, &self.external) {
            (ResolverStrategy::Hybrid, Some(external)) => {
                self.resolve_external(external.as_ref(), module_name, containing_file)
            }
            _ => None,
        };

        let native = self.resolve_native(module_name, containing_file);
        match (external, native) {
            (None, native) => native,
            (Some(external), None) => Some(external),
            (Some(external), Some(native)) => {
                if prefers_native(&external, &native) {
                    Some(native)
                } else {
                    Some(external)
                }
            }
        }
    }

    fn resolve_external(
        &self,
        external: &dyn ExternalResolver,
        module_name: &str,
        containing_file: &Path,
    ) -> Option<ResolvedModule> {
        let directory = containing_file
            .parent()
            .map(normalize)
            .unwrap_or_else(|| normalize(Path::new(".")));
        let resolved = external.resolve(&directory, module_name).ok()?;
        if is_supported_source(&resolved, self.options.allows_js()) {
            Some(ResolvedModule::new(normalize(&resolved)))
        } else {
            None
        }
    }

    fn resolve_native(&self, module_name: &str, containing_file: &Path) -> Option<ResolvedModule> {
        let directory = containing_file.parent().unwrap_or(Path::new("."));
        if let Some(cached) = self.cache.get(directory, module_name) {
            return cached;
        }
        let result =
            self.native
                .resolve_module_name(module_name, containing_file, &self.options, &self.cache);
        self.cache.insert(directory, module_name, result.clone());
        result
    }
}

fn prefers_native(external: &ResolvedModule, native: &ResolvedModule) -> bool {
    if normalize(&external.resolved_file_name) == normalize(&native.resolved_file_name) {
        return true;
    }
    is_plain_script(&external.resolved_file_name) && is_declaration(&native.resolved_file_name)
}

fn is_plain_script(path: &Path) -> bool {
    JS_EXTENSIONS.iter().any(|ext| has_suffix(path, ext))
}

fn is_declaration(path: &Path) -> bool {
    DECLARATION_EXTENSIONS.iter().any(|ext| has_suffix(path, ext))
}
