//! Per-file loader requests
//!
//! Each bundler request for one source file goes through [`ProjectLoader`]:
//! find the config, get the session, install the bundler hooks once, start
//! or join the build, then read the emitted file back. Files that are not
//! part of the project pass through untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::application::session::{BuildSignal, ConfigSession, HookKind, SessionManager, SessionRequest};
use crate::application::watch::ReplaceWatchFileSystem;
use crate::config::{find_config_file, LoaderOptions};
use crate::domain::ports::build_events::{emit, BuildEvent, BuildEventSink};
use crate::domain::ports::bundler::BundlerCompiler;
use crate::domain::ports::file_host::FileHost;
use crate::domain::ports::watch_fs::WatchFileSystem;
use crate::domain::value_objects::paths::{append_suffix, normalize};
use crate::error::BridgeResult;
use crate::infrastructure::fs::OverlayFileHost;
use crate::infrastructure::watch::NotifyWatchFileSystem;

/// Grace period for a watch-mode program reload to pick up a new file
pub const PROJECT_FILE_GRACE: Duration = Duration::from_millis(40);

/// One loader invocation
pub struct LoaderContext {
    pub resource_path: PathBuf,
    /// Bundler context directory, used as the base without a config file
    pub root_context: PathBuf,
    pub source_map: bool,
    pub compiler: Arc<dyn BundlerCompiler>,
    /// Raw source content, returned unchanged for non-project files
    pub input: String,
}

/// Result handed back to the bundler
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderOutput {
    pub content: String,
    pub source_map: Option<serde_json::Value>,
    /// The file is not part of the project and was not compiled
    pub passthrough: bool,
}

impl LoaderOutput {
    fn passthrough(input: String) -> Self {
        Self {
            content: input,
            source_map: None,
            passthrough: true,
        }
    }
}

pub struct ProjectLoader {
    manager: Arc<SessionManager>,
}

enum Pending {
    Build(BuildSignal),
    /// Not a project file yet; recheck after the grace period
    Recheck,
    Passthrough,
}

/// A request whose build has been started or joined
pub struct LoadTicket {
    session: Arc<ConfigSession>,
    ctx: LoaderContext,
    pending: Pending,
    sink: Arc<dyn BuildEventSink>,
}

impl ProjectLoader {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Start or join the build for one file and wait for its output.
    pub fn load(&self, ctx: LoaderContext, options: &LoaderOptions) -> BridgeResult<LoaderOutput> {
        self.begin(ctx, options)?.finish()
    }

    /// Start or join the build for one file without waiting.
    pub fn begin(&self, ctx: LoaderContext, options: &LoaderOptions) -> BridgeResult<LoadTicket> {
        options.validate()?;
        let resource = normalize(&ctx.resource_path);
        let compiler = Arc::clone(&ctx.compiler);
        let input_fs = compiler.input_file_system();

        let search_from = resource.parent().unwrap_or(Path::new("/"));
        let config_file = find_config_file(input_fs.as_ref(), search_from, options.config_name())?;

        let session = self.manager.get_or_create(&SessionRequest {
            compiler: compiler.as_ref(),
            config_file,
            base_path: ctx.root_context.clone(),
            source_map: ctx.source_map,
            options,
        })?;

        if let Some(store) = session.store() {
            if session.register_hook(HookKind::InputFileSystem) {
                compiler.set_input_file_system(Arc::new(OverlayFileHost::new(
                    Arc::clone(store),
                    input_fs,
                )));
            }
        }

        let sink = Arc::clone(session.sink());
        if !session.is_project_source_file(&resource) {
            let pending = if session.watch_started() {
                Pending::Recheck
            } else {
                Pending::Passthrough
            };
            return Ok(LoadTicket {
                session,
                ctx,
                pending,
                sink,
            });
        }

        let signal = start_build(&session, compiler.as_ref())?;
        Ok(LoadTicket {
            session,
            ctx,
            pending: Pending::Build(signal),
            sink,
        })
    }
}

fn start_build(session: &Arc<ConfigSession>, compiler: &dyn BundlerCompiler) -> BridgeResult<BuildSignal> {
    if !compiler.is_watch_mode() {
        return Ok(session.run_once());
    }

    if session.register_hook(HookKind::WatchFileSystem) {
        let inner: Arc<dyn WatchFileSystem> = compiler
            .watch_file_system()
            .unwrap_or_else(|| Arc::new(NotifyWatchFileSystem::new()));
        compiler.set_watch_file_system(Arc::new(ReplaceWatchFileSystem::new(
            inner,
            Arc::clone(session) as _,
            session.store().cloned(),
        )));
    }
    if session.register_hook(HookKind::WatchClose) {
        let weak = Arc::downgrade(session);
        compiler.on_watch_close(Box::new(move || {
            if let Some(session) = weak.upgrade() {
                session.stop();
            }
        }));
    }
    Ok(session.run_watch())
}

impl LoadTicket {
    pub fn session(&self) -> &Arc<ConfigSession> {
        &self.session
    }

    /// The signal this request waits on, if it started or joined a build
    pub fn signal(&self) -> Option<&BuildSignal> {
        match &self.pending {
            Pending::Build(signal) => Some(signal),
            _ => None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self.pending, Pending::Passthrough)
    }

    /// Wait for the build and read the emitted output.
    pub fn finish(self) -> BridgeResult<LoaderOutput> {
        let LoadTicket {
            session,
            ctx,
            pending,
            sink,
        } = self;
        let resource = normalize(&ctx.resource_path);

        let signal = match pending {
            Pending::Build(signal) => signal,
            Pending::Passthrough => return Ok(LoaderOutput::passthrough(ctx.input)),
            Pending::Recheck => {
                thread::sleep(PROJECT_FILE_GRACE);
                if !session.is_project_source_file(&resource) {
                    return Ok(LoaderOutput::passthrough(ctx.input));
                }
                start_build(&session, ctx.compiler.as_ref())?
            }
        };
        session.wait(signal)?;

        let fs = ctx.compiler.input_file_system();
        let emitted = session.translate_to_emitted_path(&resource);
        let js = fs.read_to_string(&emitted)?;

        if js.is_empty() || !session.options().emits_source_map() {
            return Ok(LoaderOutput {
                content: js,
                source_map: None,
                passthrough: false,
            });
        }

        match read_source_map(fs.as_ref(), &emitted, &resource, &ctx.input) {
            Ok(map) => Ok(LoaderOutput {
                content: strip_source_mapping_url(&js),
                source_map: Some(map),
                passthrough: false,
            }),
            Err(message) => {
                emit(sink.as_ref(), BuildEvent::info(message));
                Ok(LoaderOutput {
                    content: js,
                    source_map: None,
                    passthrough: false,
                })
            }
        }
    }
}

/// Read the `.map` companion and point it at the original source.
fn read_source_map(
    fs: &dyn FileHost,
    emitted: &Path,
    resource: &Path,
    input: &str,
) -> Result<serde_json::Value, String> {
    let text = fs
        .read_to_string(&append_suffix(emitted, ".map"))
        .map_err(|e| e.to_string())?;
    let mut map: serde_json::Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;
    let object = map
        .as_object_mut()
        .ok_or_else(|| "source map is not a JSON object".to_string())?;
    let source = resource.to_string_lossy().into_owned();
    object.insert("sources".to_string(), serde_json::json!([source]));
    object.insert("file".to_string(), serde_json::json!(source));
    object.insert("sourcesContent".to_string(), serde_json::json!([input]));
    Ok(map)
}

/// Drop `//# sourceMappingURL=` lines; the map travels alongside.
pub fn strip_source_mapping_url(js: &str) -> String {
    let mut out = String::with_capacity(js.len());
    for line in js.split_inclusive('\n') {
        if line.starts_with("//# sourceMappingURL=") {
            if line.ends_with("\r\n") {
                out.push_str("\r\n");
            } else if line.ends_with('\n') {
                out.push('\n');
            }
            continue;
        }
        out.push_str(line);
    }
    out
}
