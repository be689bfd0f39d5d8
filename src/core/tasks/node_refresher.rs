// src/core/tasks/node_refresher.rs

use crate::config;
use crate::core::state::ProxyState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Keeps the advertised node list in line with what the backend gateway currently knows,
/// and writes it back to the configuration file the proxy was started from.
pub struct NodeRefresherTask {
    state: Arc<ProxyState>,
    interval: Duration,
}

impl NodeRefresherTask {
    pub fn new(state: Arc<ProxyState>) -> Self {
        let interval = state.config.tasks.node_refresh_interval;
        Self { state, interval }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Node refresher started. Check interval: {:?}", self.interval);
        let mut interval = tokio::time::interval(self.interval);
        // The first tick completes immediately; the node list was just loaded.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(nodes) = self.check_once().await {
                        self.persist(nodes).await;
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Node refresher shutting down.");
                    return;
                }
            }
        }
    }

    /// Reloads the backend's cluster layout, then compares node lists. A failed reload
    /// still compares against whatever the backend last learned.
    pub async fn check_once(&self) -> Option<Vec<String>> {
        if let Err(e) = self.state.backend.refresh_topology().await {
            warn!("Failed to reload the cluster layout: {e}");
        }
        self.refresh_once()
    }

    /// Replaces the advertised list when the gateway reports a non-empty list of a different
    /// length. Returns the new list if it changed.
    pub fn refresh_once(&self) -> Option<Vec<String>> {
        let current = self.state.backend.node_addresses();
        if current.is_empty() || current.len() == self.state.live.nodes().len() {
            return None;
        }
        let previous = self.state.live.set_nodes(current.clone());
        info!(
            "Cluster node list changed from {} to {} nodes",
            previous.len(),
            current.len()
        );
        Some(current)
    }

    async fn persist(&self, nodes: Vec<String>) {
        let Some(path) = self.state.config_path.clone() else {
            return;
        };
        let result =
            tokio::task::spawn_blocking(move || config::rewrite_nodes(&path, &nodes)).await;
        match result {
            Ok(Ok(())) => info!("Node list written back to the configuration file"),
            Ok(Err(e)) => warn!("Failed to persist node list: {e:#}"),
            Err(e) => warn!("Node list persistence task failed: {e}"),
        }
    }
}
