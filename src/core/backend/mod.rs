// src/core/backend/mod.rs

//! The boundary between the proxy core and the backend cluster.
//!
//! The core only ever talks to a [`Backend`]. `ClusterGateway` is the implementation the
//! binary runs with; tests substitute in-memory backends.

use crate::core::ProxyError;
use crate::core::protocol::{Request, RespFrame};
use async_trait::async_trait;

pub mod cluster;
pub mod connection;
pub mod pool;
pub mod slot;

pub use cluster::ClusterGateway;

/// Executes single-key or keyless commands against the cluster.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Runs one command and returns the node's reply. Error replies from the node are
    /// returned as `RespFrame::Error`; `Err` means the call could not be completed.
    async fn execute(&self, request: &Request) -> Result<RespFrame, ProxyError>;

    /// Addresses of the nodes currently known to the gateway.
    fn node_addresses(&self) -> Vec<String>;

    /// Reloads the gateway's view of the cluster layout. Backends without one keep the default.
    async fn refresh_topology(&self) -> Result<(), ProxyError> {
        Ok(())
    }
}
