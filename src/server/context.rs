// src/server/context.rs

use crate::core::state::ProxyState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Holds all the initialized state required to run the proxy's main loop.
pub struct ServerContext {
    pub state: Arc<ProxyState>,
    pub listener: TcpListener,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
}

impl ServerContext {
    pub fn new(state: Arc<ProxyState>, listener: TcpListener) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            state,
            listener,
            shutdown_tx,
            background_tasks: JoinSet::new(),
        }
    }
}
