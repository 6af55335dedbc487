//! Common test utilities for tsbridge integration tests.
//!
//! This module provides:
//! - `MemoryFileHost`: in-memory bundler input filesystem
//! - `ScriptedEngine` / `WatchControl`: a compiler engine driven by the test
//! - `FakeBundler`: a bundler compiler instance with hook bookkeeping
//! - `RecordingSink`: captures build events

#![allow(dead_code)]

pub mod bundler;
pub mod engine;

pub use bundler::*;
pub use engine::*;
pub use host::*;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tsbridge::application::{LoaderContext, ProjectLoader, SessionManager};
use tsbridge::config::JsonConfigParser;
use tsbridge::domain::ports::{BuildEvent, BuildEventSink};

/// Records every event, verbose included
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<BuildEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&BuildEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl BuildEventSink for RecordingSink {
    fn on_event(&self, event: BuildEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn wants_verbose(&self) -> bool {
        true
    }
}

/// A loader wired to `engine`, plus the sink it reports to
pub fn loader(engine: Arc<ScriptedEngine>) -> (ProjectLoader, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let manager = Arc::new(SessionManager::new(
        engine,
        Arc::new(JsonConfigParser::new()),
        sink.clone(),
    ));
    (ProjectLoader::new(manager), sink)
}

pub fn request(bundler: &Arc<FakeBundler>, resource: &str, input: &str) -> LoaderContext {
    LoaderContext {
        resource_path: PathBuf::from(resource),
        root_context: PathBuf::from(PROJECT_ROOT),
        source_map: false,
        compiler: bundler.clone(),
        input: input.to_string(),
    }
}

pub fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

pub fn p(path: &str) -> &Path {
    Path::new(path)
}

/// Look through the sharing wrapper a build signal puts around its failure
pub fn unshared(err: &tsbridge::BridgeError) -> &tsbridge::BridgeError {
    match err {
        tsbridge::BridgeError::Shared(inner) => unshared(inner),
        other => other,
    }
}

/// Project `/proj` with two sources under `src/`
pub fn two_file_project() -> Arc<MemoryFileHost> {
    Arc::new(MemoryFileHost::with_files(&[
        ("/proj/src/a.ts", "export const a = 1;"),
        ("/proj/src/b.ts", "export const b = 2;"),
    ]))
}

/// Poll `cond` for up to a second
pub fn eventually(cond: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(1);
    while std::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    cond()
}
