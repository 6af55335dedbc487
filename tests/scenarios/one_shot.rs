//! Scenario: One-shot build
//!
//! Journey: A bundler runs once (no watch) over a TypeScript project.
//!
//! Steps:
//! 1. The first source request locates the config and starts the build
//! 2. Every other request joins the same build
//! 3. Each request reads its emitted file back from the private output root
//!
//! Success Criteria:
//! - The compiler runs exactly once per configuration
//! - Compilation errors reach every waiting request
//! - Files outside the project pass through untouched

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use tsbridge::config::LoaderOptions;
use tsbridge::domain::ports::{BuildEvent, Diagnostic};
use tsbridge::{BridgeError, LoaderContext, LocalFileHost};

use crate::common::*;

/// SCENARIO: Project without a tsconfig.json uses the default configuration
#[test]
fn scenario_default_configuration_compiles_project() {
    let host = two_file_project();
    let bundler = FakeBundler::new(1, false, host);
    let engine = ScriptedEngine::new();
    let (loader, sink) = loader(engine.clone());

    let out = loader
        .load(
            request(&bundler, "/proj/src/a.ts", "export const a = 1;"),
            &LoaderOptions::default(),
        )
        .expect("load a.ts");

    assert!(!out.passthrough);
    assert_eq!(out.content, "// cycle 0\nexport const a = 1;\n");
    assert_eq!(out.source_map, None);
    assert_eq!(engine.emits(), 1);
    assert_eq!(
        sink.count(|e| matches!(e, BuildEvent::ConfigResolved { config_file: None })),
        1
    );
    assert_eq!(
        sink.count(|e| matches!(e, BuildEvent::BuildStarted { watch: false, .. })),
        1
    );
}

/// SCENARIO: A silent loader only reports errors
#[test]
fn scenario_silent_loader_reports_only_errors() {
    let bundler = FakeBundler::new(1, false, two_file_project());
    let engine = ScriptedEngine::new();
    let (loader, sink) = loader(engine.clone());
    let options = LoaderOptions {
        silent: true,
        show_version: true,
        ..Default::default()
    };

    loader
        .load(request(&bundler, "/proj/src/a.ts", ""), &options)
        .expect("load a.ts");
    assert!(sink.events().is_empty(), "got: {:?}", sink.events());

    engine.set_diagnostics(vec![Diagnostic::error(2304, "Cannot find name 'x'.")]);
    let other = FakeBundler::new(2, false, two_file_project());
    let _ = loader.load(request(&other, "/proj/src/a.ts", ""), &options);
    assert!(sink
        .events()
        .iter()
        .all(|e| matches!(e, BuildEvent::Error { .. })));
}

/// SCENARIO: Later requests reuse the build and the installed overlay
#[test]
fn scenario_second_file_reuses_build() {
    let bundler = FakeBundler::new(1, false, two_file_project());
    let engine = ScriptedEngine::new();
    let (loader, _sink) = loader(engine.clone());
    let options = LoaderOptions::default();

    loader
        .load(request(&bundler, "/proj/src/a.ts", ""), &options)
        .expect("load a.ts");
    let out = loader
        .load(request(&bundler, "/proj/src/b.ts", ""), &options)
        .expect("load b.ts");

    assert!(out.content.contains("export const b = 2;"));
    assert_eq!(engine.emits(), 1);
    assert_eq!(bundler.fs_replacements.load(Ordering::SeqCst), 1);
    assert_eq!(loader.manager().len(), 1);
}

/// SCENARIO: Concurrent requests join the single build in flight
#[test]
fn scenario_concurrent_requests_share_signal() {
    let bundler = FakeBundler::new(1, false, two_file_project());
    let engine = ScriptedEngine::new();
    engine.set_delay(Duration::from_millis(50));
    let (loader, _sink) = loader(engine.clone());
    let options = LoaderOptions::default();

    let first = loader
        .begin(request(&bundler, "/proj/src/a.ts", ""), &options)
        .expect("begin a.ts");
    let second = loader
        .begin(request(&bundler, "/proj/src/b.ts", ""), &options)
        .expect("begin b.ts");

    assert!(first.signal().unwrap().ptr_eq(second.signal().unwrap()));

    let a = thread::spawn(move || first.finish());
    let b = thread::spawn(move || second.finish());
    assert!(a.join().unwrap().unwrap().content.contains("const a"));
    assert!(b.join().unwrap().unwrap().content.contains("const b"));
    assert_eq!(engine.emits(), 1);
}

/// SCENARIO: Compilation errors fail every request of the build
#[test]
fn scenario_diagnostics_reject_all_waiters() {
    let bundler = FakeBundler::new(1, false, two_file_project());
    let engine = ScriptedEngine::new();
    engine.set_diagnostics(vec![Diagnostic::error(
        2322,
        "Type 'string' is not assignable to type 'number'.",
    )
    .with_file("/proj/src/a.ts")]);
    let (loader, _sink) = loader(engine.clone());
    let options = LoaderOptions::default();

    for file in ["/proj/src/a.ts", "/proj/src/b.ts"] {
        let err = loader
            .load(request(&bundler, file, ""), &options)
            .expect_err("build has errors");
        assert!(matches!(unshared(&err), BridgeError::Compilation { .. }));
        assert!(err.to_string().contains("TS2322"), "got: {}", err);
    }
    assert_eq!(engine.emits(), 1);
}

/// SCENARIO: A file the project does not include passes through
#[test]
fn scenario_foreign_file_passes_through() {
    let bundler = FakeBundler::new(1, false, two_file_project());
    let engine = ScriptedEngine::new();
    let (loader, _sink) = loader(engine.clone());

    let out = loader
        .load(
            request(&bundler, "/proj/vendor/lib.ts", "export {};"),
            &LoaderOptions::default(),
        )
        .expect("passthrough");

    assert!(out.passthrough);
    assert_eq!(out.content, "export {};");
    assert_eq!(engine.emits(), 0);
}

/// SCENARIO: Source maps are attached to the output and point at the source
#[test]
fn scenario_source_map_attached() {
    let bundler = FakeBundler::new(1, false, two_file_project());
    let engine = ScriptedEngine::new();
    let (loader, _sink) = loader(engine.clone());

    let ctx = LoaderContext {
        source_map: true,
        ..request(&bundler, "/proj/src/a.ts", "export const a = 1;")
    };
    let out = loader.load(ctx, &LoaderOptions::default()).expect("load");

    assert!(!out.content.contains("sourceMappingURL"));
    let map = out.source_map.expect("source map");
    assert_eq!(map["sources"], serde_json::json!(["/proj/src/a.ts"]));
    assert_eq!(map["sourcesContent"], serde_json::json!(["export const a = 1;"]));
    assert_eq!(map["mappings"], "AAAA");
}

/// SCENARIO: A missing source map degrades to unmapped output
#[test]
fn scenario_missing_source_map_reports_info() {
    let bundler = FakeBundler::new(1, false, two_file_project());
    let engine = ScriptedEngine::new();
    engine.skip_source_maps();
    let (loader, sink) = loader(engine.clone());

    let ctx = LoaderContext {
        source_map: true,
        ..request(&bundler, "/proj/src/a.ts", "")
    };
    let out = loader.load(ctx, &LoaderOptions::default()).expect("load");

    assert!(out.content.contains("export const a = 1;"));
    assert_eq!(out.source_map, None);
    assert_eq!(sink.count(|e| matches!(e, BuildEvent::Info { .. })), 1);
}

/// SCENARIO: tsconfig.json found above the source file drives the build
#[test]
fn scenario_tsconfig_is_discovered() {
    let host = two_file_project();
    host.add(
        "/proj/tsconfig.json",
        r#"{
            // comments are allowed
            "compilerOptions": { "rootDir": "src" },
            "include": ["src"]
        }"#,
    );
    let bundler = FakeBundler::new(1, false, host);
    let engine = ScriptedEngine::new();
    let (loader, sink) = loader(engine.clone());

    let ticket = loader
        .begin(request(&bundler, "/proj/src/a.ts", ""), &LoaderOptions::default())
        .expect("begin");
    let session = Arc::clone(ticket.session());
    let out = ticket.finish().expect("finish");

    assert!(out.content.contains("const a"));
    assert_eq!(session.config_file(), Some(p("/proj/tsconfig.json")));
    assert_eq!(
        session.translate_to_emitted_path(p("/proj/src/a.ts")),
        session.out_dir().join("a.js")
    );
    assert_eq!(
        sink.count(|e| matches!(e, BuildEvent::ConfigResolved { config_file: Some(_) })),
        1
    );
}

/// SCENARIO: Conflicting config options are rejected before anything runs
#[test]
fn scenario_conflicting_config_options() {
    let bundler = FakeBundler::new(1, false, two_file_project());
    let engine = ScriptedEngine::new();
    let (loader, _sink) = loader(engine.clone());
    let options = LoaderOptions {
        config_file: Some("tsconfig.json".to_string()),
        config_file_name: Some("tsconfig.build.json".to_string()),
        ..Default::default()
    };

    let err = loader
        .load(request(&bundler, "/proj/src/a.ts", ""), &options)
        .expect_err("conflict");
    assert!(matches!(err, BridgeError::ConflictingOptions));
    assert!(loader.manager().is_empty());
}

/// SCENARIO: An explicitly named config that does not exist is an error
#[test]
fn scenario_named_config_missing() {
    let bundler = FakeBundler::new(1, false, two_file_project());
    let (loader, _sink) = loader(ScriptedEngine::new());
    let options = LoaderOptions {
        config_file: Some("tsconfig.build.json".to_string()),
        ..Default::default()
    };

    let err = loader
        .load(request(&bundler, "/proj/src/a.ts", ""), &options)
        .expect_err("missing config");
    match err {
        BridgeError::ConfigNotFound { name } => assert_eq!(name, "tsconfig.build.json"),
        other => panic!("unexpected error: {other}"),
    }
}

/// SCENARIO: Bundling options cannot work with per-file loading
#[test]
fn scenario_out_file_rejected() {
    let host = two_file_project();
    host.add(
        "/proj/tsconfig.json",
        r#"{ "compilerOptions": { "outFile": "bundle.js" } }"#,
    );
    let bundler = FakeBundler::new(1, false, host);
    let engine = ScriptedEngine::new();
    let (loader, _sink) = loader(engine.clone());

    let err = loader
        .load(request(&bundler, "/proj/src/a.ts", ""), &LoaderOptions::default())
        .expect_err("outFile");
    assert!(matches!(err, BridgeError::UnsupportedOption { ref option } if option == "outFile"));
    assert_eq!(engine.emits(), 0);
}

/// SCENARIO: tempBuildDir sends the output to a real directory
#[test]
fn scenario_temp_build_dir_on_disk() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/a.ts"), "export const a = 1;").unwrap();
    std::fs::write(root.join("tsconfig.json"), "{}").unwrap();

    let bundler = FakeBundler::new(2, false, Arc::new(LocalFileHost::new()));
    let engine = ScriptedEngine::new();
    let (loader, _sink) = loader(engine.clone());
    let options = LoaderOptions {
        temp_build_dir: Some(".build".into()),
        ..Default::default()
    };

    let ctx = LoaderContext {
        resource_path: root.join("src/a.ts"),
        root_context: root.clone(),
        source_map: false,
        compiler: bundler.clone(),
        input: String::new(),
    };
    let out = loader.load(ctx, &options).expect("load");

    assert!(out.content.contains("export const a = 1;"));
    assert!(root.join(".build/a.js").is_file());
    assert_eq!(bundler.fs_replacements.load(Ordering::SeqCst), 0);
}
