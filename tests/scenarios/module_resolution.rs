//! Scenario: Module resolution
//!
//! Journey: Project sources import modules the bundler knows how to find
//! (aliases, packages) alongside ones only the compiler resolves.
//!
//! Success Criteria:
//! - Bundler answers are used when the compiler can load the file
//! - Declaration files win over plain scripts for the same module
//! - Native-only mode never consults the bundler
//! - Resolutions are cached per program

use std::path::PathBuf;

use tsbridge::config::LoaderOptions;

use crate::common::*;

fn project(files: &[(&str, &str)]) -> std::sync::Arc<MemoryFileHost> {
    std::sync::Arc::new(MemoryFileHost::with_files(files))
}

fn resolved_as(engine: &ScriptedEngine, name: &str) -> Vec<Option<PathBuf>> {
    engine
        .resolved()
        .into_iter()
        .filter(|(n, _)| n == name)
        .map(|(_, r)| r)
        .collect()
}

/// SCENARIO: An alias only the bundler knows resolves through it
#[test]
fn scenario_bundler_alias_resolves() {
    let host = project(&[
        ("/proj/src/a.ts", "import { x } from '@lib/x';\nexport const a = x;"),
        ("/proj/src/lib/x.ts", "export const x = 1;"),
    ]);
    let bundler = FakeBundler::with_resolver(
        1,
        false,
        host,
        TableResolver::new(&[("@lib/x", "/proj/src/lib/x.ts")]),
    );
    let engine = ScriptedEngine::new();
    let (loader, _sink) = loader(engine.clone());

    loader
        .load(request(&bundler, "/proj/src/a.ts", ""), &LoaderOptions::default())
        .expect("load");

    assert_eq!(
        resolved_as(&engine, "@lib/x"),
        vec![Some(PathBuf::from("/proj/src/lib/x.ts"))]
    );
}

/// SCENARIO: The compiler's declaration file beats the bundler's script
#[test]
fn scenario_declaration_preferred_over_script() {
    let host = project(&[("/proj/src/a.ts", "import pkg from \"pkg\";")]);
    let bundler = FakeBundler::with_resolver(
        1,
        false,
        host,
        TableResolver::new(&[("pkg", "/proj/node_modules/pkg/index.js")]),
    );
    let engine = ScriptedEngine::with_native(&[("pkg", "/proj/node_modules/pkg/index.d.ts")]);
    let (loader, _sink) = loader(engine.clone());

    loader
        .load(request(&bundler, "/proj/src/a.ts", ""), &LoaderOptions::default())
        .expect("load");

    assert_eq!(
        resolved_as(&engine, "pkg"),
        vec![Some(PathBuf::from("/proj/node_modules/pkg/index.d.ts"))]
    );
}

/// SCENARIO: A bundler answer the compiler cannot load is dropped
#[test]
fn scenario_unloadable_bundler_answer_ignored() {
    let host = project(&[("/proj/src/a.ts", "import './style.css';")]);
    let bundler = FakeBundler::with_resolver(
        1,
        false,
        host,
        TableResolver::new(&[("./style.css", "/proj/src/style.css")]),
    );
    let engine = ScriptedEngine::new();
    let (loader, _sink) = loader(engine.clone());

    loader
        .load(request(&bundler, "/proj/src/a.ts", ""), &LoaderOptions::default())
        .expect("load");

    assert_eq!(resolved_as(&engine, "./style.css"), vec![None]);
}

/// SCENARIO: Native-only resolution ignores the bundler
#[test]
fn scenario_native_only_resolution() {
    let host = project(&[("/proj/src/a.ts", "import { x } from '@lib/x';")]);
    let bundler = FakeBundler::with_resolver(
        1,
        false,
        host,
        TableResolver::new(&[("@lib/x", "/proj/src/lib/x.ts")]),
    );
    let engine = ScriptedEngine::new();
    let (loader, _sink) = loader(engine.clone());
    let options = LoaderOptions {
        use_ts_module_resolution: true,
        ..Default::default()
    };

    loader
        .load(request(&bundler, "/proj/src/a.ts", ""), &options)
        .expect("load");

    assert_eq!(resolved_as(&engine, "@lib/x"), vec![None]);
    assert_eq!(engine.native_calls(), 1);
}

/// SCENARIO: Sibling files share cached resolutions within one program
#[test]
fn scenario_resolutions_cached_per_directory() {
    let host = project(&[
        ("/proj/src/a.ts", "import { s } from 'shared';"),
        ("/proj/src/b.ts", "import { s } from 'shared';"),
    ]);
    let bundler = FakeBundler::new(1, false, host);
    let engine = ScriptedEngine::with_native(&[("shared", "/proj/node_modules/shared/index.d.ts")]);
    let (loader, _sink) = loader(engine.clone());

    loader
        .load(request(&bundler, "/proj/src/a.ts", ""), &LoaderOptions::default())
        .expect("load");

    assert_eq!(resolved_as(&engine, "shared").len(), 2);
    assert_eq!(engine.native_calls(), 1);
}

/// SCENARIO: Every watch cycle starts with an empty resolution cache
#[test]
fn scenario_watch_cycle_refreshes_cache() {
    let host = project(&[("/proj/src/a.ts", "import { s } from 'shared';")]);
    let bundler = FakeBundler::new(1, true, host);
    let engine = ScriptedEngine::with_native(&[("shared", "/proj/node_modules/shared/index.d.ts")]);
    let (loader, _sink) = loader(engine.clone());

    loader
        .load(request(&bundler, "/proj/src/a.ts", ""), &LoaderOptions::default())
        .expect("initial build");
    assert_eq!(engine.native_calls(), 1);

    engine.control().change(None);
    assert_eq!(engine.native_calls(), 2);
}
