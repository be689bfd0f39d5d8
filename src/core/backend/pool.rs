// src/core/backend/pool.rs

//! A bounded pool of connections to one backend node.

use super::connection::NodeConnection;
use crate::core::ProxyError;
use crate::core::protocol::{Request, RespFrame};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

/// At most `size` connections to the node are in use at once. Connections are reused in
/// LIFO order and discarded after any transport failure.
#[derive(Debug)]
pub struct NodePool {
    addr: String,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<NodeConnection>>,
    connect_timeout: Duration,
    io_timeout: Duration,
    /// Replica pools send `READONLY` on every new connection.
    readonly: bool,
}

impl NodePool {
    pub fn new(
        addr: &str,
        size: usize,
        connect_timeout: Duration,
        io_timeout: Duration,
        readonly: bool,
    ) -> Self {
        Self {
            addr: addr.to_string(),
            permits: Arc::new(Semaphore::new(size.max(1))),
            idle: Mutex::new(Vec::with_capacity(size)),
            connect_timeout,
            io_timeout,
            readonly,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Runs `request` on a pooled connection.
    pub async fn call(&self, request: &Request) -> Result<RespFrame, ProxyError> {
        self.call_inner(None, request).await
    }

    /// Runs `request` right after `ASKING` on the same connection.
    pub async fn call_asking(&self, request: &Request) -> Result<RespFrame, ProxyError> {
        let asking = Request::from_parts([Bytes::from_static(b"ASKING")]);
        self.call_inner(Some(&asking), request).await
    }

    async fn call_inner(
        &self,
        prelude: Option<&Request>,
        request: &Request,
    ) -> Result<RespFrame, ProxyError> {
        let _permit = tokio::time::timeout(self.io_timeout, self.permits.acquire())
            .await
            .map_err(|_| ProxyError::Backend(format!("pool for {} exhausted", self.addr)))?
            .map_err(|_| ProxyError::Internal("node pool closed".to_string()))?;

        let parked = self.idle.lock().pop();
        let mut conn = match parked {
            Some(conn) => conn,
            None => self.open().await?,
        };

        if let Some(prelude) = prelude {
            conn.call_expect_ok(prelude).await?;
        }
        let reply = conn.call(request).await?;
        self.idle.lock().push(conn);
        Ok(reply)
    }

    async fn open(&self) -> Result<NodeConnection, ProxyError> {
        debug!("Opening backend connection to {}", self.addr);
        let mut conn =
            NodeConnection::connect(&self.addr, self.connect_timeout, self.io_timeout).await?;
        if self.readonly {
            let readonly = Request::from_parts([Bytes::from_static(b"READONLY")]);
            conn.call_expect_ok(&readonly).await?;
        }
        Ok(conn)
    }

    /// Connections currently parked in the pool.
    pub fn idle_len(&self) -> usize {
        self.idle.lock().len()
    }
}
