//! Scripted compiler engine
//!
//! "Compiles" every root file by copying it into the output directory as a
//! `.js` file, resolving the modules it imports through the host. Watch
//! mode hands the test a `WatchControl` to drive cycles by hand.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tsbridge::domain::ports::{
    CompileRequest, CompilerEngine, CompilerHost, Diagnostic, EmitResult, NativeResolver,
    ProgramInfo, TimerHost, WatchProgram, WatchReporter, COMPILATION_FINISHED,
    FILE_CHANGE_DETECTED,
};
use tsbridge::domain::value_objects::paths::{relative_path, with_extension};
use tsbridge::domain::value_objects::CompilerOptions;
use tsbridge::BridgeResult;

use super::bundler::TableNative;

/// Behaviour shared by one-shot and watch builds
#[derive(Default)]
pub struct Script {
    pub emits: AtomicUsize,
    pub cycle: AtomicUsize,
    native: Arc<TableNative>,
    diagnostics: Mutex<Vec<Diagnostic>>,
    skip_maps: AtomicBool,
    delay: Mutex<Duration>,
    resolved: Mutex<Vec<(String, Option<PathBuf>)>>,
}

fn common_directory(files: &[PathBuf]) -> Option<PathBuf> {
    let mut common = files.first()?.parent()?.to_path_buf();
    for file in files.iter().skip(1) {
        while !file.starts_with(&common) {
            common = common.parent()?.to_path_buf();
        }
    }
    Some(common)
}

fn imports(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| line.trim_start().starts_with("import"))
        .filter_map(|line| {
            let start = line.find(['\'', '"'])?;
            let quote = line[start..].chars().next()?;
            let rest = &line[start + 1..];
            let end = rest.find(quote)?;
            Some(rest[..end].to_string())
        })
        .collect()
}

impl Script {
    fn compile(
        &self,
        root_files: &[PathBuf],
        options: &CompilerOptions,
        host: &dyn CompilerHost,
    ) -> EmitResult {
        self.emits.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        let cycle = self.cycle.load(Ordering::SeqCst);
        let common = common_directory(root_files);
        let base = options.root_dir.clone().or_else(|| common.clone()).unwrap_or_default();
        let out_dir = options.out_dir.clone().unwrap_or_else(|| base.clone());

        for file in root_files {
            if file.to_string_lossy().ends_with(".d.ts") {
                continue;
            }
            let content = host.read_file(file).unwrap_or_default();

            let names = imports(&content);
            if !names.is_empty() {
                let results = host.resolve_module_names(&names, file);
                let mut resolved = self.resolved.lock().unwrap();
                for (name, result) in names.into_iter().zip(results) {
                    resolved.push((name, result.map(|r| r.resolved_file_name)));
                }
            }

            let js_path = out_dir.join(with_extension(&relative_path(&base, file), "js"));
            let js_name = js_path.file_name().unwrap().to_string_lossy().into_owned();
            let mut js = format!("// cycle {}\n{}\n", cycle, content);
            if options.emits_source_map() && !self.skip_maps.load(Ordering::SeqCst) {
                js.push_str(&format!("//# sourceMappingURL={}.map\n", js_name));
                let map = serde_json::json!({
                    "version": 3,
                    "file": js_name,
                    "sources": [file.file_name().unwrap().to_string_lossy()],
                    "mappings": "AAAA",
                });
                let map_path = PathBuf::from(format!("{}.map", js_path.display()));
                host.write_file(&map_path, &map.to_string(), &[file.clone()])
                    .unwrap();
            }
            host.write_file(&js_path, &js, &[file.clone()]).unwrap();
        }

        EmitResult {
            diagnostics: self.diagnostics.lock().unwrap().clone(),
            common_source_directory: common,
        }
    }
}

pub struct ScriptedEngine {
    pub script: Arc<Script>,
    pub watches: AtomicUsize,
    control: Mutex<Option<Arc<WatchControl>>>,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Self::with_native(&[])
    }

    pub fn with_native(entries: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            script: Arc::new(Script {
                native: Arc::new(TableNative::new(entries)),
                ..Default::default()
            }),
            watches: AtomicUsize::new(0),
            control: Mutex::new(None),
        })
    }

    pub fn emits(&self) -> usize {
        self.script.emits.load(Ordering::SeqCst)
    }

    pub fn set_diagnostics(&self, diagnostics: Vec<Diagnostic>) {
        *self.script.diagnostics.lock().unwrap() = diagnostics;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.script.delay.lock().unwrap() = delay;
    }

    pub fn skip_source_maps(&self) {
        self.script.skip_maps.store(true, Ordering::SeqCst);
    }

    pub fn resolved(&self) -> Vec<(String, Option<PathBuf>)> {
        self.script.resolved.lock().unwrap().clone()
    }

    pub fn native_calls(&self) -> usize {
        self.script.native.calls.load(Ordering::SeqCst)
    }

    /// Handle on the running watch loop
    pub fn control(&self) -> Arc<WatchControl> {
        self.control
            .lock()
            .unwrap()
            .clone()
            .expect("watch loop not started")
    }
}

impl CompilerEngine for ScriptedEngine {
    fn emit(&self, request: &CompileRequest, host: &dyn CompilerHost) -> EmitResult {
        self.script.compile(&request.root_files, &request.options, host)
    }

    fn watch(
        &self,
        request: CompileRequest,
        host: Arc<dyn CompilerHost>,
        reporter: Arc<dyn WatchReporter>,
        timers: Arc<dyn TimerHost>,
    ) -> BridgeResult<Box<dyn WatchProgram>> {
        self.watches.fetch_add(1, Ordering::SeqCst);
        let control = Arc::new(WatchControl {
            script: Arc::clone(&self.script),
            host,
            reporter,
            timers,
            options: request.options,
            root_files: Mutex::new(request.root_files),
            updates: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        *self.control.lock().unwrap() = Some(Arc::clone(&control));

        control.reporter.on_status(&Diagnostic::message(
            6031,
            "Starting compilation in watch mode...",
        ));
        control.build();
        Ok(Box::new(ScriptedProgram { control }))
    }

    fn native_resolver(&self) -> Arc<dyn NativeResolver> {
        self.script.native.clone()
    }
}

/// Drives a running watch loop from the test
pub struct WatchControl {
    script: Arc<Script>,
    host: Arc<dyn CompilerHost>,
    reporter: Arc<dyn WatchReporter>,
    timers: Arc<dyn TimerHost>,
    options: CompilerOptions,
    root_files: Mutex<Vec<PathBuf>>,
    updates: Mutex<Vec<Vec<PathBuf>>>,
    closed: AtomicBool,
}

impl WatchControl {
    fn build(&self) {
        let files = self.root_files.lock().unwrap().clone();
        self.reporter.on_program_created(&ProgramInfo {
            root_files: files.clone(),
            options: self.options.clone(),
            common_source_directory: common_directory(&files),
        });
        let result = self.script.compile(&files, &self.options, self.host.as_ref());
        for diagnostic in &result.diagnostics {
            self.reporter.on_diagnostic(diagnostic);
        }
        self.reporter.on_status(&Diagnostic::message(
            COMPILATION_FINISHED,
            format!("Found {} errors. Watching for file changes.", result.diagnostics.len()),
        ));
    }

    /// Report a source change; the cycle stays open until `finish_change`.
    pub fn begin_change(&self) {
        self.script.cycle.fetch_add(1, Ordering::SeqCst);
        self.reporter.on_status(&Diagnostic::message(
            FILE_CHANGE_DETECTED,
            "File change detected. Starting incremental compilation...",
        ));
    }

    /// Rebuild (optionally with a new root file list) and close the cycle.
    pub fn finish_change(&self, root_files: Option<Vec<PathBuf>>) {
        if let Some(files) = root_files {
            *self.root_files.lock().unwrap() = files;
        }
        self.build();
    }

    pub fn change(&self, root_files: Option<Vec<PathBuf>>) {
        self.begin_change();
        self.finish_change(root_files);
    }

    pub fn status(&self, code: u32) {
        self.reporter.on_status(&Diagnostic::message(code, "status"));
    }

    /// Schedule a full change cycle through the loop's timer host.
    pub fn schedule_change(self: &Arc<Self>, delay: Duration) {
        let control = Arc::clone(self);
        self.timers
            .set_timeout(delay, Box::new(move || control.change(None)));
    }

    pub fn root_files(&self) -> Vec<PathBuf> {
        self.root_files.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<Vec<PathBuf>> {
        self.updates.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn host(&self) -> &Arc<dyn CompilerHost> {
        &self.host
    }
}

struct ScriptedProgram {
    control: Arc<WatchControl>,
}

impl WatchProgram for ScriptedProgram {
    fn update_root_files(&mut self, files: &[PathBuf]) {
        *self.control.root_files.lock().unwrap() = files.to_vec();
        self.control.updates.lock().unwrap().push(files.to_vec());
    }

    fn close(&mut self) {
        self.control.closed.store(true, Ordering::SeqCst);
    }
}
