//! Session registry
//!
//! Sessions live as long as the bundler compiler they belong to. Creation
//! happens under the registry lock, so concurrent requests for one key
//! always end up with the same session.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{load_config_file, ConfigParser, LoadSettings, LoaderOptions};
use crate::domain::ports::build_events::{emit, BuildEvent, BuildEventSink, FilteredEventSink};
use crate::domain::ports::bundler::{BundlerCompiler, CompilerId};
use crate::domain::ports::compiler::CompilerEngine;
use crate::error::BridgeResult;

use super::{ConfigSession, SessionKey, SessionSetup};

/// What a loader request knows when it asks for a session
pub struct SessionRequest<'a> {
    pub compiler: &'a dyn BundlerCompiler,
    pub config_file: Option<PathBuf>,
    /// Directory searched for sources when there is no config file
    pub base_path: PathBuf,
    pub source_map: bool,
    pub options: &'a LoaderOptions,
}

pub struct SessionManager {
    registry: Mutex<HashMap<SessionKey, Arc<ConfigSession>>>,
    engine: Arc<dyn CompilerEngine>,
    parser: Arc<dyn ConfigParser>,
    sink: Arc<dyn BuildEventSink>,
}

impl SessionManager {
    pub fn new(
        engine: Arc<dyn CompilerEngine>,
        parser: Arc<dyn ConfigParser>,
        sink: Arc<dyn BuildEventSink>,
    ) -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            engine,
            parser,
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionKey, Arc<ConfigSession>>> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn sink(&self) -> &Arc<dyn BuildEventSink> {
        &self.sink
    }

    /// Existing session for the request's key, or a new one.
    ///
    /// A configuration error leaves nothing cached; the next request for
    /// the same key tries again.
    pub fn get_or_create(&self, request: &SessionRequest<'_>) -> BridgeResult<Arc<ConfigSession>> {
        let key = SessionKey {
            compiler: request.compiler.id(),
            config_file: request.config_file.clone(),
        };

        let mut registry = self.lock();
        if let Some(session) = registry.get(&key) {
            return Ok(Arc::clone(session));
        }

        let options = request.options;
        let sink: Arc<dyn BuildEventSink> = Arc::new(FilteredEventSink::new(
            Arc::clone(&self.sink),
            options.silent,
            options.verbose,
        ));
        if options.show_version {
            emit(
                sink.as_ref(),
                BuildEvent::Version {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                },
            );
        }
        emit(
            sink.as_ref(),
            BuildEvent::ConfigResolved {
                config_file: key.config_file.clone(),
            },
        );

        let input_fs = request.compiler.input_file_system();
        let settings = LoadSettings {
            base_path: request.base_path.clone(),
            source_map: request.source_map,
            temp_build_dir: options.temp_build_dir.clone(),
            overrides: options.compiler_options.clone(),
        };
        let config = load_config_file(
            input_fs.as_ref(),
            self.parser.as_ref(),
            key.config_file.as_deref(),
            &settings,
        )?;

        let session = ConfigSession::new(SessionSetup {
            key: key.clone(),
            config,
            input_fs,
            engine: Arc::clone(&self.engine),
            external: Some(request.compiler.external_resolver()),
            strategy: options.resolver_strategy(),
            locale: options.locale.clone(),
            sink,
        });
        registry.insert(key, Arc::clone(&session));
        Ok(session)
    }

    pub fn get(&self, key: &SessionKey) -> Option<Arc<ConfigSession>> {
        self.lock().get(key).cloned()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Stop and forget every session of a compiler instance. Returns how
    /// many were released.
    pub fn release_compiler(&self, compiler: CompilerId) -> usize {
        let released: Vec<Arc<ConfigSession>> = {
            let mut registry = self.lock();
            let keys: Vec<SessionKey> = registry
                .keys()
                .filter(|key| key.compiler == compiler)
                .cloned()
                .collect();
            keys.iter().filter_map(|key| registry.remove(key)).collect()
        };
        for session in &released {
            session.stop();
        }
        released.len()
    }
}
