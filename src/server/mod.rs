// src/server/mod.rs

use crate::config::Config;
use crate::core::state::{LogReloadHandle, ProxyState};
use anyhow::Result;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

mod connection_loop;
mod context;
mod initialization;
mod metrics_server;
mod spawner;

pub use context::ServerContext;

/// The main startup function, orchestrating all setup phases. Runs until SIGINT or SIGTERM.
pub async fn run(
    config: Config,
    config_path: Option<PathBuf>,
    log_reload_handle: Arc<LogReloadHandle>,
) -> Result<()> {
    let shutdown = connection_loop::shutdown_signal()?;

    // 1. Connect to the cluster, build the shared state and bind the listener.
    let mut server_context = initialization::setup(config, config_path, log_reload_handle).await?;

    // 2. Spawn all background tasks.
    spawner::spawn_all(&mut server_context);

    // 3. Accept connections until a shutdown signal arrives.
    connection_loop::run(server_context, shutdown).await;

    Ok(())
}

/// Runs the proxy over an already bound listener and an already built state until
/// `shutdown` resolves. Background tasks are spawned as in [`run`].
pub async fn serve(
    listener: TcpListener,
    state: Arc<ProxyState>,
    shutdown: impl Future<Output = ()>,
) {
    let mut ctx = ServerContext::new(state, listener);
    spawner::spawn_all(&mut ctx);
    connection_loop::run(ctx, shutdown).await;
}
