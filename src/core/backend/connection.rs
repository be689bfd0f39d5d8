// src/core/backend/connection.rs

//! A single connection to one backend node.

use crate::core::ProxyError;
use crate::core::protocol::{Request, RespFrame, RespFrameCodec};
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::Decoder;

/// Sends requests to one node and reads exactly one reply per request.
#[derive(Debug)]
pub struct NodeConnection<S = TcpStream> {
    addr: String,
    stream: S,
    read_buf: BytesMut,
    io_timeout: Duration,
}

impl NodeConnection {
    /// Connects to `addr` within `connect_timeout`.
    pub async fn connect(
        addr: &str,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> Result<Self, ProxyError> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ProxyError::Backend(format!("connect to {addr} timed out")))?
            .map_err(|e| ProxyError::Backend(format!("connect to {addr} failed: {e}")))?;
        stream.set_nodelay(true).ok();
        Ok(Self::from_stream(addr, stream, io_timeout))
    }
}

impl<S> NodeConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already established stream to the node at `addr`.
    pub fn from_stream(addr: &str, stream: S, io_timeout: Duration) -> Self {
        Self {
            addr: addr.to_string(),
            stream,
            read_buf: BytesMut::with_capacity(4096),
            io_timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends one request and waits for its reply. Error replies are returned as frames;
    /// only transport failures and timeouts are `Err`.
    pub async fn call(&mut self, request: &Request) -> Result<RespFrame, ProxyError> {
        let mut write_buf = BytesMut::new();
        request.encode(&mut write_buf);

        tokio::time::timeout(self.io_timeout, self.stream.write_all(&write_buf))
            .await
            .map_err(|_| ProxyError::Backend(format!("write to {} timed out", self.addr)))?
            .map_err(|e| ProxyError::Backend(format!("write to {} failed: {e}", self.addr)))?;

        loop {
            if let Some(reply) = RespFrameCodec.decode(&mut self.read_buf)? {
                return Ok(reply);
            }
            let read_fut = self.stream.read_buf(&mut self.read_buf);
            match tokio::time::timeout(self.io_timeout, read_fut).await {
                Ok(Ok(0)) => {
                    return Err(ProxyError::Backend(format!(
                        "connection to {} closed by peer",
                        self.addr
                    )));
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    return Err(ProxyError::Backend(format!(
                        "read from {} failed: {e}",
                        self.addr
                    )));
                }
                Err(_) => {
                    return Err(ProxyError::Backend(format!(
                        "read from {} timed out",
                        self.addr
                    )));
                }
            }
        }
    }

    /// Sends a request that must be answered with `+OK`.
    pub async fn call_expect_ok(&mut self, request: &Request) -> Result<(), ProxyError> {
        match self.call(request).await? {
            RespFrame::SimpleString(s) if s.eq_ignore_ascii_case("OK") => Ok(()),
            other => Err(ProxyError::Backend(format!(
                "unexpected reply to {} from {}: {other:?}",
                request.name(),
                self.addr
            ))),
        }
    }
}
