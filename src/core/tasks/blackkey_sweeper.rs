// src/core/tasks/blackkey_sweeper.rs

use crate::core::state::ProxyState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

/// Drops blacklist entries whose deadline has passed.
///
/// Lookups already ignore expired entries, so this only bounds memory and keeps
/// `PROXY BLACK GET` and the gauge tidy. Every entry is visited on each pass.
pub struct BlackKeySweeperTask {
    state: Arc<ProxyState>,
    interval: Duration,
}

impl BlackKeySweeperTask {
    pub fn new(state: Arc<ProxyState>) -> Self {
        let interval = state.config.tasks.blacklist_sweep_interval;
        Self { state, interval }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Black key sweeper started. Check interval: {:?}", self.interval);
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep_once();
                }
                _ = shutdown_rx.recv() => {
                    info!("Black key sweeper shutting down.");
                    return;
                }
            }
        }
    }

    pub fn sweep_once(&self) -> usize {
        let expired = self.state.black_keys.sweep_expired();
        for entry in &expired {
            info!(
                "Black key '{}' expired after {:?}",
                String::from_utf8_lossy(&entry.key),
                entry.lifetime()
            );
        }
        expired.len()
    }
}
