//! Watch state machine
//!
//! Turns the compiler's status notifications into rebuild cycles:
//!
//! - `FILE_CHANGE_DETECTED` opens a cycle (`Idle -> Rebuilding`): a start
//!   hook mints a token, and the source/destination map is snapshotted and
//!   cleared.
//! - Program creation diffs the root files against the previous cycle and
//!   queues the outputs of deleted sources.
//! - `COMPILATION_FINISHED` closes the cycle (`Rebuilding -> Idle`): queued
//!   outputs that were not re-emitted are removed from the store, then the
//!   finish hook receives the token.
//!
//! The machine starts in `Rebuilding` for the initial compilation, which has
//! no token. Every other status code is only logged.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::domain::entities::{diff_deleted, SourceDestMap};
use crate::domain::ports::build_events::{emit, BuildEvent, BuildEventSink};
use crate::domain::ports::compiler::{
    Diagnostic, ProgramInfo, WatchReporter, COMPILATION_FINISHED, FILE_CHANGE_DETECTED,
};
use crate::domain::value_objects::paths::{append_suffix, normalize};
use crate::infrastructure::fs::VirtualOutputStore;

/// Callbacks the machine drives at cycle boundaries
pub trait CycleHooks: Send + Sync {
    /// Value produced when a cycle opens and handed back when it closes
    type Token: Send;

    fn start_rebuild(&self) -> Self::Token;

    /// `token` is `None` for the initial compilation.
    fn finish_rebuild(&self, token: Option<Self::Token>, elapsed: Option<Duration>);

    fn program_created(&self, program: &ProgramInfo);

    /// Emitted path for a source the previous map has no entry for
    fn fallback_destination(&self, source: &Path) -> Option<PathBuf>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Idle,
    Rebuilding,
}

struct CycleState<T> {
    phase: WatchPhase,
    token: Option<T>,
    started_at: Option<Instant>,
    previous: SourceDestMap,
    root_files: Vec<PathBuf>,
    pending_deletions: Vec<PathBuf>,
    initial_done: bool,
    stopped: bool,
}

pub struct WatchStateMachine<H: CycleHooks> {
    hooks: H,
    map: Arc<Mutex<SourceDestMap>>,
    store: Option<Arc<VirtualOutputStore>>,
    sink: Arc<dyn BuildEventSink>,
    state: Mutex<CycleState<H::Token>>,
}

impl<H: CycleHooks> WatchStateMachine<H> {
    pub fn new(
        hooks: H,
        map: Arc<Mutex<SourceDestMap>>,
        store: Option<Arc<VirtualOutputStore>>,
        sink: Arc<dyn BuildEventSink>,
        root_files: Vec<PathBuf>,
    ) -> Self {
        Self {
            hooks,
            map,
            store,
            sink,
            state: Mutex::new(CycleState {
                phase: WatchPhase::Rebuilding,
                token: None,
                started_at: None,
                previous: SourceDestMap::new(),
                root_files,
                pending_deletions: Vec::new(),
                initial_done: false,
                stopped: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CycleState<H::Token>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_map(&self) -> MutexGuard<'_, SourceDestMap> {
        self.map.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn phase(&self) -> WatchPhase {
        self.lock().phase
    }

    /// Whether the initial compilation has finished
    pub fn is_watching(&self) -> bool {
        self.lock().initial_done
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Ignore every later notification. An open cycle's token is dropped
    /// without reaching the finish hook.
    pub fn stop(&self) {
        let token = {
            let mut state = self.lock();
            state.stopped = true;
            state.phase = WatchPhase::Idle;
            state.token.take()
        };
        drop(token);
    }

    fn begin_cycle(&self) {
        let mut state = self.lock();
        if state.stopped {
            return;
        }
        state.started_at = Some(Instant::now());
        {
            let mut map = self.lock_map();
            let snapshot = map.snapshot_and_clear();
            // A cycle that never finished leaves a partial map behind; the
            // last completed cycle stays the reference.
            if state.phase == WatchPhase::Idle {
                state.previous = snapshot;
            }
        }
        let superseded = state.token.replace(self.hooks.start_rebuild());
        state.phase = WatchPhase::Rebuilding;
        drop(state);
        drop(superseded);
    }

    fn end_cycle(&self) {
        let mut state = self.lock();
        if state.stopped {
            return;
        }
        let token = state.token.take();
        let elapsed = state.started_at.take().map(|t| t.elapsed());
        let pending = std::mem::take(&mut state.pending_deletions);
        let watching = state.initial_done;
        state.phase = WatchPhase::Idle;
        state.initial_done = true;
        drop(state);

        let deleted = self.remove_deleted_outputs(pending);
        if !deleted.is_empty() {
            emit(self.sink.as_ref(), BuildEvent::OutputsDeleted { paths: deleted });
        }

        self.hooks.finish_rebuild(token, elapsed);

        if watching {
            emit(
                self.sink.as_ref(),
                BuildEvent::CompilationFinished {
                    elapsed_ms: elapsed.map(|d| d.as_millis()),
                },
            );
        }
    }

    fn remove_deleted_outputs(&self, pending: Vec<PathBuf>) -> Vec<PathBuf> {
        let deleted: Vec<PathBuf> = {
            let map = self.lock_map();
            pending
                .into_iter()
                .filter(|dest| !map.contains_destination(dest))
                .collect()
        };
        let Some(store) = &self.store else {
            return Vec::new();
        };
        if deleted.is_empty() {
            return deleted;
        }
        let mut targets = deleted.clone();
        targets.extend(deleted.iter().map(|d| append_suffix(d, ".map")));
        store.remove(&targets);
        deleted
    }
}

impl<H: CycleHooks> WatchReporter for WatchStateMachine<H> {
    fn on_diagnostic(&self, diagnostic: &Diagnostic) {
        let watching = {
            let state = self.lock();
            if state.stopped {
                return;
            }
            state.initial_done
        };
        emit(
            self.sink.as_ref(),
            BuildEvent::Error {
                watching,
                message: diagnostic.to_string(),
            },
        );
    }

    fn on_status(&self, diagnostic: &Diagnostic) {
        if self.is_stopped() {
            return;
        }
        match diagnostic.code {
            FILE_CHANGE_DETECTED => {
                emit(self.sink.as_ref(), BuildEvent::FileChangeDetected);
                self.begin_cycle();
            }
            COMPILATION_FINISHED => self.end_cycle(),
            _ => {}
        }
        emit(
            self.sink.as_ref(),
            BuildEvent::Verbose {
                message: diagnostic.to_string(),
                code: Some(diagnostic.code),
            },
        );
    }

    fn on_program_created(&self, program: &ProgramInfo) {
        {
            let mut state = self.lock();
            if state.stopped {
                return;
            }
            let new_files: Vec<PathBuf> = program.root_files.iter().map(|f| normalize(f)).collect();
            let old_files: Vec<PathBuf> = state.root_files.iter().map(|f| normalize(f)).collect();
            for source in diff_deleted(&old_files, &new_files) {
                let destination = state
                    .previous
                    .destination_for(&source)
                    .map(Path::to_path_buf)
                    .or_else(|| self.hooks.fallback_destination(&source));
                if let Some(destination) = destination {
                    state.pending_deletions.push(destination);
                }
            }
            state.root_files = new_files;
        }
        self.hooks.program_created(program);
    }
}
