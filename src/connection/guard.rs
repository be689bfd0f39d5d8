// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard that takes a session out of the registry.

use crate::core::state::ProxyState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Removes the session from the registry when the connection handler's scope is exited,
/// whatever path it exits by.
pub struct ConnectionGuard {
    pub(crate) state: Arc<ProxyState>,
    pub(crate) session_id: u64,
    pub(crate) addr: SocketAddr,
}

impl ConnectionGuard {
    pub(crate) fn new(state: Arc<ProxyState>, session_id: u64, addr: SocketAddr) -> Self {
        Self {
            state,
            session_id,
            addr,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.state.sessions.remove(&self.addr, self.session_id) {
            debug!("Session {} for {} removed from registry", self.session_id, self.addr);
        } else {
            // The reaper got there first.
            debug!(
                "Session {} for {} was already gone from the registry",
                self.session_id, self.addr
            );
        }
    }
}
