//! Build sessions
//!
//! One [`ConfigSession`] exists per (bundler compiler, config file) pair. It
//! owns the output target, the source/destination map and the compiler host,
//! and hands out the [`BuildSignal`] every requester waits on:
//!
//! - one-shot builds run the compiler once and memoize the signal
//! - watch builds start a single watch loop and renew the signal on every
//!   rebuild cycle

mod host;
mod manager;
mod signal;


pub use host::SessionCompilerHost;
pub use manager::{SessionManager, SessionRequest};
pub use signal::{BuildOutcome, BuildSignal, SignalCompleter};

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread;
use std::time::Duration;

use crate::application::resolve::{create_resolver, ModuleResolver};
use crate::application::watch::{CycleHooks, OutputTranslator, TrackedTimers, WatchStateMachine};
use crate::config::{BuildConfig, OutputTarget, ResolverStrategy};
use crate::domain::entities::SourceDestMap;
use crate::domain::ports::build_events::{emit, BuildEvent, BuildEventSink};
use crate::domain::ports::bundler::CompilerId;
use crate::domain::ports::compiler::{CompileRequest, CompilerEngine, ProgramInfo, WatchProgram};
use crate::domain::ports::file_host::FileHost;
use crate::domain::ports::resolver::{ExternalResolver, ResolutionCache};
use crate::domain::services::{base_path, TranslationContext};
use crate::domain::value_objects::CompilerOptions;
use crate::error::{BridgeError, BridgeResult};
use crate::infrastructure::fs::VirtualOutputStore;

/// Registry key: the compiler instance and the resolved config file
/// (`None` for the default configuration)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub compiler: CompilerId,
    pub config_file: Option<PathBuf>,
}

/// Bundler hooks installed at most once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    InputFileSystem,
    WatchFileSystem,
    WatchClose,
}

/// Everything a session is built from
pub struct SessionSetup {
    pub key: SessionKey,
    pub config: BuildConfig,
    pub input_fs: Arc<dyn FileHost>,
    pub engine: Arc<dyn CompilerEngine>,
    pub external: Option<Arc<dyn ExternalResolver>>,
    pub strategy: ResolverStrategy,
    pub locale: Option<String>,
    pub sink: Arc<dyn BuildEventSink>,
}

/// State that follows the latest program
struct ProgramState {
    options: CompilerOptions,
    root_files: Vec<PathBuf>,
    common_source_directory: Option<PathBuf>,
}

#[derive(Default)]
struct RunState {
    signal: Option<BuildSignal>,
    /// Completer of the initial watch build, which has no cycle token
    initial: Option<SignalCompleter>,
    watch_started: bool,
    watching: bool,
    stopped: bool,
    machine: Option<Arc<WatchStateMachine<SessionCycleHooks>>>,
    timers: Option<Arc<TrackedTimers>>,
}

pub struct ConfigSession {
    key: SessionKey,
    config_directory: PathBuf,
    extended_options: CompilerOptions,
    output: OutputTarget,
    map: Arc<Mutex<SourceDestMap>>,
    host: Arc<SessionCompilerHost>,
    engine: Arc<dyn CompilerEngine>,
    external: Option<Arc<dyn ExternalResolver>>,
    strategy: ResolverStrategy,
    locale: Option<String>,
    sink: Arc<dyn BuildEventSink>,
    program: Mutex<ProgramState>,
    run: Mutex<RunState>,
    watch_program: Mutex<Option<Box<dyn WatchProgram>>>,
    hooks: Mutex<HashSet<HookKind>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl ConfigSession {
    pub fn new(setup: SessionSetup) -> Arc<Self> {
        let SessionSetup {
            key,
            config,
            input_fs,
            engine,
            external,
            strategy,
            locale,
            sink,
        } = setup;

        let map = Arc::new(Mutex::new(SourceDestMap::new()));
        let base = base_path(&config.options, None, &config.config_directory);
        let resolver = build_resolver(
            strategy,
            &config.options,
            &engine,
            external.clone(),
            &base,
        );
        let host = Arc::new(SessionCompilerHost::new(
            input_fs,
            config.output.clone(),
            Arc::clone(&map),
            resolver,
        ));

        Arc::new(Self {
            key,
            config_directory: config.config_directory,
            extended_options: config.extended_options,
            output: config.output,
            map,
            host,
            engine,
            external,
            strategy,
            locale,
            sink,
            program: Mutex::new(ProgramState {
                options: config.options,
                root_files: config.root_files,
                common_source_directory: None,
            }),
            run: Mutex::new(RunState::default()),
            watch_program: Mutex::new(None),
            hooks: Mutex::new(HashSet::new()),
        })
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Event sink filtered by this session's loader options
    pub fn sink(&self) -> &Arc<dyn BuildEventSink> {
        &self.sink
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.key.config_file.as_deref()
    }

    pub fn store(&self) -> Option<&Arc<VirtualOutputStore>> {
        self.output.store()
    }

    pub fn out_dir(&self) -> &Path {
        self.output.out_dir()
    }

    pub fn host(&self) -> &Arc<SessionCompilerHost> {
        &self.host
    }

    pub fn options(&self) -> CompilerOptions {
        lock(&self.program).options.clone()
    }

    pub fn root_files(&self) -> Vec<PathBuf> {
        lock(&self.program).root_files.clone()
    }

    /// Record that a bundler hook is installed. Returns `false` if it
    /// already was.
    pub fn register_hook(&self, kind: HookKind) -> bool {
        lock(&self.hooks).insert(kind)
    }

    /// Whether a watch loop was ever started for this session
    pub fn watch_started(&self) -> bool {
        lock(&self.run).watch_started
    }

    /// Whether the initial watch build has finished
    pub fn is_watching(&self) -> bool {
        lock(&self.run).watching
    }

    pub fn is_stopped(&self) -> bool {
        lock(&self.run).stopped
    }

    /// The signal requesters should wait on, if a build has been started
    pub fn current_signal(&self) -> Option<BuildSignal> {
        lock(&self.run).signal.clone()
    }

    /// Wait for `signal`, following the session to newer signals when a
    /// rebuild cycle supersedes it.
    pub fn wait(&self, signal: BuildSignal) -> BridgeResult<()> {
        let mut signal = signal;
        loop {
            match signal.wait() {
                Err(err) if err.is_superseded() => {
                    let next = match self.current_signal() {
                        Some(next) if !next.ptr_eq(&signal) => next,
                        _ => return Err(err),
                    };
                    signal = next;
                }
                outcome => return outcome,
            }
        }
    }

    // === Builds ===

    /// Run the compiler once. Later calls return the same signal.
    pub fn run_once(self: &Arc<Self>) -> BuildSignal {
        let completer = {
            let mut run = lock(&self.run);
            if let Some(signal) = &run.signal {
                return signal.clone();
            }
            let (signal, completer) = BuildSignal::pending();
            run.signal = Some(signal);
            completer
        };
        let signal = completer.signal();

        emit(
            self.sink.as_ref(),
            BuildEvent::BuildStarted {
                config_file: self.key.config_file.clone(),
                watch: false,
            },
        );

        let session = Arc::clone(self);
        thread::spawn(move || {
            let outcome = session.compile_once();
            completer.complete(outcome);
        });
        signal
    }

    fn compile_once(&self) -> BridgeResult<()> {
        let request = {
            let program = lock(&self.program);
            let mut options = program.options.clone();
            if options.locale.is_none() {
                options.locale = self.locale.clone();
            }
            CompileRequest {
                config_file: self.key.config_file.clone(),
                root_files: program.root_files.clone(),
                options,
            }
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.engine.emit(&request, self.host.as_ref())
        }))
        .map_err(|payload| BridgeError::Engine {
            message: panic_message(payload),
        })?;

        if let Some(dir) = result.common_source_directory {
            lock(&self.program).common_source_directory = Some(dir);
        }
        if result.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::Compilation {
                diagnostics: result.diagnostics,
            })
        }
    }

    /// Start the watch loop once. Returns the signal of the cycle in flight.
    pub fn run_watch(self: &Arc<Self>) -> BuildSignal {
        let (signal, machine, timers) = {
            let mut run = lock(&self.run);
            if run.watch_started || run.stopped {
                if let Some(signal) = &run.signal {
                    return signal.clone();
                }
            }
            run.watch_started = true;
            let (signal, completer) = BuildSignal::pending();
            run.signal = Some(signal.clone());
            run.initial = Some(completer);

            let machine = Arc::new(WatchStateMachine::new(
                SessionCycleHooks {
                    session: Arc::downgrade(self),
                },
                Arc::clone(&self.map),
                self.store().cloned(),
                Arc::clone(&self.sink),
                self.root_files(),
            ));
            let timers = Arc::new(TrackedTimers::new());
            run.machine = Some(Arc::clone(&machine));
            run.timers = Some(Arc::clone(&timers));
            (signal, machine, timers)
        };

        emit(
            self.sink.as_ref(),
            BuildEvent::BuildStarted {
                config_file: self.key.config_file.clone(),
                watch: true,
            },
        );

        let session = Arc::clone(self);
        let request = self.watch_request();
        let requested_files = request.root_files.clone();
        thread::spawn(move || {
            let host = Arc::clone(&session.host);
            let started = panic::catch_unwind(AssertUnwindSafe(|| {
                session.engine.watch(request, host, machine, timers)
            }))
            .unwrap_or_else(|payload| {
                Err(BridgeError::Engine {
                    message: panic_message(payload),
                })
            });

            match started {
                Ok(mut program) => {
                    // stop() sets `stopped` before it empties the slot
                    let mut slot = lock(&session.watch_program);
                    if session.is_stopped() {
                        drop(slot);
                        program.close();
                        return;
                    }
                    // Root files replaced while the loop was starting
                    let files = session.root_files();
                    if session.key.config_file.is_none() && files != requested_files {
                        program.update_root_files(&files);
                    }
                    *slot = Some(program);
                }
                Err(err) => session.fail_watch(err),
            }
        });
        signal
    }

    /// The engine re-reads a config file itself, so only the overrides go
    /// along; without one it gets the full option set.
    fn watch_request(&self) -> CompileRequest {
        let program = lock(&self.program);
        let mut options = match &self.key.config_file {
            Some(_) => self.extended_options.clone(),
            None => program.options.clone(),
        };
        if options.locale.is_none() {
            options.locale = self.locale.clone();
        }
        CompileRequest {
            config_file: self.key.config_file.clone(),
            root_files: program.root_files.clone(),
            options,
        }
    }

    fn fail_watch(&self, err: BridgeError) {
        let initial = lock(&self.run).initial.take();
        match initial {
            Some(completer) => completer.complete(Err(err)),
            None => emit(
                self.sink.as_ref(),
                BuildEvent::Error {
                    watching: self.is_watching(),
                    message: err.to_string(),
                },
            ),
        }
    }

    /// Replace the root files of a watch session that has no config file.
    /// Returns `false` when the file list is owned by a config file.
    pub fn update_root_files(&self, files: Vec<PathBuf>) -> bool {
        if self.key.config_file.is_some() {
            return false;
        }
        let mut slot = lock(&self.watch_program);
        lock(&self.program).root_files = files.clone();
        if let Some(program) = slot.as_mut() {
            program.update_root_files(&files);
        }
        true
    }

    /// Stop the watch loop: cancel timers, close the program and fail every
    /// waiter still pending.
    pub fn stop(&self) {
        let (machine, timers, initial) = {
            let mut run = lock(&self.run);
            if run.stopped {
                return;
            }
            run.stopped = true;
            run.signal = Some(BuildSignal::settled(Err(BridgeError::Watch {
                message: "watch stopped".to_string(),
            })));
            (run.machine.take(), run.timers.take(), run.initial.take())
        };
        drop(initial);
        if let Some(timers) = timers {
            timers.stop();
        }
        if let Some(machine) = machine {
            machine.stop();
        }
        if let Some(mut program) = lock(&self.watch_program).take() {
            program.close();
        }
    }

    /// Take over the options, root files and common source directory of a
    /// newly created watch program.
    fn adopt_program(&self, info: &ProgramInfo) {
        let resolver = {
            let mut program = lock(&self.program);
            let mut options = info.options.clone();
            options.out_dir = Some(self.out_dir().to_path_buf());
            program.options = options;
            program.root_files = info.root_files.clone();
            if let Some(dir) = &info.common_source_directory {
                program.common_source_directory = Some(dir.clone());
            }
            let base = base_path(
                &program.options,
                program.common_source_directory.as_deref(),
                &self.config_directory,
            );
            build_resolver(
                self.strategy,
                &program.options,
                &self.engine,
                self.external.clone(),
                &base,
            )
        };
        self.host.set_resolver(resolver);
    }

    // === Translation ===

    fn with_translation<R>(&self, f: impl FnOnce(&TranslationContext<'_>) -> R) -> R {
        let program = lock(&self.program);
        let map = lock(&self.map);
        let base = base_path(
            &program.options,
            program.common_source_directory.as_deref(),
            &self.config_directory,
        );
        let ctx = TranslationContext {
            map: &map,
            base_path: &base,
            out_dir: self.output.out_dir(),
            root_files: &program.root_files,
        };
        f(&ctx)
    }

    pub fn translate_to_emitted_path(&self, source: &Path) -> PathBuf {
        self.with_translation(|ctx| ctx.to_emitted_path(source))
    }

    pub fn translate_to_source_path(&self, emitted: &Path) -> PathBuf {
        self.with_translation(|ctx| ctx.to_source_path(emitted))
    }

    pub fn is_project_source_file(&self, path: &Path) -> bool {
        self.with_translation(|ctx| ctx.is_project_source_file(path))
    }
}

fn build_resolver(
    strategy: ResolverStrategy,
    options: &CompilerOptions,
    engine: &Arc<dyn CompilerEngine>,
    external: Option<Arc<dyn ExternalResolver>>,
    base: &Path,
) -> ModuleResolver {
    create_resolver(
        strategy,
        options.clone(),
        engine.native_resolver(),
        external,
        ResolutionCache::new(base),
    )
}

impl OutputTranslator for ConfigSession {
    fn is_project_source_file(&self, path: &Path) -> bool {
        ConfigSession::is_project_source_file(self, path)
    }

    fn to_emitted_path(&self, source: &Path) -> PathBuf {
        self.translate_to_emitted_path(source)
    }

    fn to_source_path(&self, emitted: &Path) -> PathBuf {
        self.translate_to_source_path(emitted)
    }

    fn out_dir(&self) -> PathBuf {
        self.output.out_dir().to_path_buf()
    }
}

/// Cycle hooks that renew the session's signal
pub struct SessionCycleHooks {
    session: Weak<ConfigSession>,
}

impl CycleHooks for SessionCycleHooks {
    type Token = SignalCompleter;

    fn start_rebuild(&self) -> SignalCompleter {
        let (signal, completer) = BuildSignal::pending();
        if let Some(session) = self.session.upgrade() {
            let initial = {
                let mut run = lock(&session.run);
                run.signal = Some(signal);
                run.initial.take()
            };
            // Waiters of an unfinished initial build move to this cycle
            drop(initial);
        }
        completer
    }

    fn finish_rebuild(&self, token: Option<SignalCompleter>, _elapsed: Option<Duration>) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let completer = {
            let mut run = lock(&session.run);
            run.watching = true;
            token.or_else(|| run.initial.take())
        };
        if let Some(completer) = completer {
            completer.complete(Ok(()));
        }
    }

    fn program_created(&self, program: &ProgramInfo) {
        if let Some(session) = self.session.upgrade() {
            session.adopt_program(program);
        }
    }

    fn fallback_destination(&self, source: &Path) -> Option<PathBuf> {
        self.session
            .upgrade()
            .map(|session| session.translate_to_emitted_path(source))
    }
}
