// src/core/state/core.rs

//! Defines the central `ProxyState` struct, holding all shared proxy-wide state.

use super::blackkeys::BlackKeys;
use super::live_config::LiveConfig;
use super::registry::SessionRegistry;
use super::stats::StatsState;
use crate::config::Config;
use crate::core::backend::Backend;
use crate::core::commands::CommandTable;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{filter::EnvFilter, reload};

pub type LogReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// Shared by the accept loop, every session, the admin commands and the background tasks.
/// Nothing here is global: tests build one instance per case.
pub struct ProxyState {
    /// The configuration the proxy was started with. Runtime changes go to `live`.
    pub config: Config,
    /// The file `config` was loaded from, if any. The node refresher rewrites it.
    pub config_path: Option<PathBuf>,
    pub live: Arc<LiveConfig>,
    pub sessions: SessionRegistry,
    pub black_keys: BlackKeys,
    /// The dispatch table, built once at startup.
    pub commands: CommandTable,
    pub stats: StatsState,
    pub backend: Arc<dyn Backend>,
    /// Applies `PROXY CONFIG SET loglevel` to the running subscriber. `None` in tests.
    pub log_reload_handle: Option<Arc<LogReloadHandle>>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl ProxyState {
    /// Builds the state around an already connected backend and the live config it shares.
    pub fn new(config: Config, live: Arc<LiveConfig>, backend: Arc<dyn Backend>) -> Self {
        Self {
            config,
            config_path: None,
            live,
            sessions: SessionRegistry::new(),
            black_keys: BlackKeys::new(),
            commands: CommandTable::standard(),
            stats: StatsState::new(),
            backend,
            log_reload_handle: None,
            started_at: chrono::Utc::now(),
        }
    }

    /// Convenience for callers that do not need to share the live config with the backend.
    pub fn with_backend(config: Config, backend: Arc<dyn Backend>) -> Self {
        let live = Arc::new(LiveConfig::from_config(&config));
        Self::new(config, live, backend)
    }

    pub fn with_log_reload_handle(mut self, handle: Arc<LogReloadHandle>) -> Self {
        self.log_reload_handle = Some(handle);
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Whole seconds since startup.
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}
