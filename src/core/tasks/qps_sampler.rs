// src/core/tasks/qps_sampler.rs

use crate::core::metrics;
use crate::core::state::ProxyState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

/// Periodically turns the operation counter into a requests-per-second figure.
pub struct QpsSamplerTask {
    state: Arc<ProxyState>,
    interval: Duration,
}

impl QpsSamplerTask {
    pub fn new(state: Arc<ProxyState>) -> Self {
        let interval = state.config.tasks.qps_sample_interval;
        Self { state, interval }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("QPS sampler started. Sample interval: {:?}", self.interval);
        let mut interval = tokio::time::interval(self.interval);
        let mut last_sample = Instant::now();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(last_sample).as_secs_f64();
                    last_sample = now;
                    let qps = self.state.stats.sample_qps(elapsed);
                    metrics::LAST_QPS.set(qps as i64);
                    debug!("Sampled {qps} requests per second");
                }
                _ = shutdown_rx.recv() => {
                    info!("QPS sampler shutting down.");
                    return;
                }
            }
        }
    }
}
