// src/server/initialization.rs

//! Builds everything the proxy needs before it accepts its first connection: the live
//! configuration, the backend gateway, the shared state and the listener.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::backend::{Backend, ClusterGateway};
use crate::core::state::{LiveConfig, LogReloadHandle, ProxyState};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Initializes all proxy components before starting the main loop.
pub async fn setup(
    config: Config,
    config_path: Option<PathBuf>,
    log_reload_handle: Arc<LogReloadHandle>,
) -> Result<ServerContext> {
    log_startup_info(&config);

    let live = Arc::new(LiveConfig::from_config(&config));
    let gateway =
        ClusterGateway::connect(config.nodes.clone(), config.backend.clone(), live.clone())
            .await
            .context("Failed to load the cluster layout from any seed node")?;
    info!(
        "Backend gateway ready with {} known nodes.",
        gateway.node_addresses().len()
    );

    let mut state =
        ProxyState::new(config, live, Arc::new(gateway)).with_log_reload_handle(log_reload_handle);
    if let Some(path) = config_path {
        state = state.with_config_path(path);
    }

    let listen_addr = state.config.listen_addr();
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    info!("SpinelProxy listening on {listen_addr}");

    Ok(ServerContext::new(Arc::new(state), listener))
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!(
        "Proxy '{}' ({}) starting with {} seed nodes.",
        config.name,
        config.id,
        config.nodes.len()
    );
    info!(
        "Limits: {} connections, {}s idle timeout, fan-out parallelism {}, {} connections per node.",
        config.max_connections,
        config.idle_timeout_secs,
        config.fanout_parallelism,
        config.pool_size_per_node
    );
    if config.slave_ok {
        info!("Read-only commands may be served by replicas.");
    }
    if config.nodes.len() == 1 {
        warn!("Only one seed node configured; the proxy cannot start if it is unreachable.");
    }
}
