// src/core/tasks/idle_reaper.rs

use crate::core::metrics;
use crate::core::state::ProxyState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Closes sessions that have been idle for longer than the live `idletime` setting.
pub struct IdleReaperTask {
    state: Arc<ProxyState>,
    interval: Duration,
}

impl IdleReaperTask {
    pub fn new(state: Arc<ProxyState>) -> Self {
        let interval = state.config.tasks.idle_reap_interval;
        Self { state, interval }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Idle reaper started. Check interval: {:?}", self.interval);
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.reap_once();
                }
                _ = shutdown_rx.recv() => {
                    info!("Idle reaper shutting down.");
                    return;
                }
            }
        }
    }

    /// One sweep. The timeout is read each time so `PROXY CONFIG SET idletime` applies at
    /// the next sweep.
    pub fn reap_once(&self) -> usize {
        let idle_timeout = self.state.live.idle_timeout();
        let reaped = self.state.sessions.reap_idle(idle_timeout);
        for session in &reaped {
            info!(
                "Closing idle session {} from {} (idle {:?}, age {:?})",
                session.session_id, session.addr, session.idle, session.age
            );
        }
        if !reaped.is_empty() {
            metrics::IDLE_SESSIONS_REAPED_TOTAL.inc_by(reaped.len() as u64);
            debug!("Idle reaper removed {} sessions", reaped.len());
        }
        reaped.len()
    }
}
