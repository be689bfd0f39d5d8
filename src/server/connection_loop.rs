// src/server/connection_loop.rs

//! Contains the main loop for accepting connections and handling graceful shutdown.

use super::context::ServerContext;
use crate::connection::ConnectionHandler;
use crate::core::metrics;
use anyhow::{Context, Result};
use std::future::Future;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Resolves on the first SIGINT or SIGTERM.
pub fn shutdown_signal() -> Result<impl Future<Output = ()> + Send> {
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown."),
            _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown."),
        }
    })
}

/// Accepts connections until `shutdown` resolves, then drains sessions and background tasks.
pub async fn run(mut ctx: ServerContext, shutdown: impl Future<Output = ()>) {
    let mut client_tasks = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            res = ctx.listener.accept() => {
                let (socket, addr) = match res {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                ctx.state.stats.increment_total_connections();
                metrics::CONNECTIONS_RECEIVED_TOTAL.inc();

                let max_connections = ctx.state.live.max_connections();
                let Some(registration) = ctx.state.sessions.try_register(addr, max_connections) else {
                    warn!(
                        "Rejecting connection from {addr}: session limit of {max_connections} reached."
                    );
                    ctx.state.stats.increment_rejected_connections();
                    metrics::CONNECTIONS_REJECTED_TOTAL.inc();
                    drop(socket);
                    continue;
                };
                debug!("Accepted connection from {addr} as session {}", registration.session_id);

                if let Err(e) = socket.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY for {addr}: {e}");
                }
                let state = ctx.state.clone();
                let global_shutdown_rx = ctx.shutdown_tx.subscribe();
                client_tasks.spawn(async move {
                    let mut handler =
                        ConnectionHandler::new(socket, addr, state, registration, global_shutdown_rx);
                    handler.run().await;
                });
            },

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    drain(ctx, client_tasks).await;
}

async fn drain(mut ctx: ServerContext, mut client_tasks: JoinSet<()>) {
    let timeout = ctx.state.config.shutdown_timeout;

    info!("Shutting down. Sending signal to all tasks.");
    if ctx.shutdown_tx.send(()).is_err() {
        debug!("No task was subscribed to the shutdown signal.");
    }
    drop(ctx.listener);

    info!("Waiting for {} client sessions to finish...", client_tasks.len());
    if tokio::time::timeout(timeout, async {
        while client_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for client sessions; aborting the rest.");
        client_tasks.shutdown().await;
    }
    info!("All client connections closed.");

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(timeout, async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
        ctx.background_tasks.shutdown().await;
    }
    info!("Proxy shutdown complete.");
}
