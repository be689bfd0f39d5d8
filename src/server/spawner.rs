// src/server/spawner.rs

//! Spawns all of the proxy's long-running background tasks.

use super::context::ServerContext;
use super::metrics_server;
use crate::core::tasks::{
    blackkey_sweeper::BlackKeySweeperTask, idle_reaper::IdleReaperTask,
    node_refresher::NodeRefresherTask, qps_sampler::QpsSamplerTask,
};
use tracing::info;

/// Spawns every background task into the context's `JoinSet`. Each task gets its own
/// subscription to the shutdown broadcast.
pub fn spawn_all(ctx: &mut ServerContext) {
    let state = &ctx.state;
    let shutdown_tx = &ctx.shutdown_tx;
    let background_tasks = &mut ctx.background_tasks;

    // --- Metrics Server ---
    if state.config.metrics.enabled {
        let metrics_state = state.clone();
        let shutdown_rx_metrics = shutdown_tx.subscribe();
        background_tasks.spawn(async move {
            metrics_server::run_metrics_server(metrics_state, shutdown_rx_metrics).await;
            Ok(())
        });
    } else {
        info!("Prometheus metrics server is disabled in the configuration.");
    }

    // --- Session and blacklist housekeeping ---
    let reaper = IdleReaperTask::new(state.clone());
    let shutdown_rx_reaper = shutdown_tx.subscribe();
    background_tasks.spawn(async move {
        reaper.run(shutdown_rx_reaper).await;
        Ok(())
    });

    let sweeper = BlackKeySweeperTask::new(state.clone());
    let shutdown_rx_sweeper = shutdown_tx.subscribe();
    background_tasks.spawn(async move {
        sweeper.run(shutdown_rx_sweeper).await;
        Ok(())
    });

    // --- Throughput and topology ---
    let sampler = QpsSamplerTask::new(state.clone());
    let shutdown_rx_sampler = shutdown_tx.subscribe();
    background_tasks.spawn(async move {
        sampler.run(shutdown_rx_sampler).await;
        Ok(())
    });

    let refresher = NodeRefresherTask::new(state.clone());
    let shutdown_rx_refresher = shutdown_tx.subscribe();
    background_tasks.spawn(async move {
        refresher.run(shutdown_rx_refresher).await;
        Ok(())
    });

    info!("All background tasks have been spawned.");
}
