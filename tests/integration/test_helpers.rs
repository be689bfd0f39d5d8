// tests/integration/test_helpers.rs

//! Test helpers: an in-memory backend and a proxy listening on an ephemeral port.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use spinelproxy::config::Config;
use spinelproxy::core::ProxyError;
use spinelproxy::core::backend::Backend;
use spinelproxy::core::protocol::{Request, RespFrame, RespFrameCodec};
use spinelproxy::core::state::ProxyState;
use spinelproxy::server;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

/// A key-value store behind the `Backend` trait, with latency and failure injection.
#[derive(Default)]
pub struct MockBackend {
    data: Mutex<HashMap<Bytes, Bytes>>,
    delays: Mutex<HashMap<Bytes, Duration>>,
    failing: Mutex<HashSet<Bytes>>,
    calls: Mutex<Vec<Request>>,
    nodes: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.data
            .lock()
            .insert(Bytes::from(key.to_string()), Bytes::from(value.to_string()));
    }

    pub fn value(&self, key: &str) -> Option<Bytes> {
        self.data.lock().get(key.as_bytes()).cloned()
    }

    /// Every call touching `key` sleeps for `delay` first.
    pub fn delay(&self, key: &str, delay: Duration) {
        self.delays.lock().insert(Bytes::from(key.to_string()), delay);
    }

    /// Every call touching `key` fails with a transport error.
    pub fn fail(&self, key: &str) {
        self.failing.lock().insert(Bytes::from(key.to_string()));
    }

    pub fn set_nodes(&self, nodes: &[&str]) {
        *self.nodes.lock() = nodes.iter().map(|n| n.to_string()).collect();
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn execute(&self, request: &Request) -> Result<RespFrame, ProxyError> {
        self.calls.lock().push(request.clone());
        let key = request.args().first().cloned().unwrap_or_default();

        let delay = self.delays.lock().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(&key) {
            return Err(ProxyError::Backend(format!(
                "node for key '{}' unreachable",
                String::from_utf8_lossy(&key)
            )));
        }

        let args = request.args();
        let reply = match request.name() {
            "GET" => match self.data.lock().get(&key) {
                Some(v) => RespFrame::BulkString(v.clone()),
                None => RespFrame::Null,
            },
            "SET" => {
                self.data.lock().insert(key, args[1].clone());
                RespFrame::ok()
            }
            "DEL" => {
                let removed = args
                    .iter()
                    .filter(|k| self.data.lock().remove(*k).is_some())
                    .count();
                RespFrame::Integer(removed as i64)
            }
            "EXISTS" => RespFrame::Integer(self.data.lock().contains_key(&key) as i64),
            other => RespFrame::Error(format!("ERR mock does not implement '{other}'")),
        };
        Ok(reply)
    }

    fn node_addresses(&self) -> Vec<String> {
        self.nodes.lock().clone()
    }
}

/// Configuration suited to tests: small limits and fast background tasks.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.id = "test-proxy".into();
    config.name = "test".into();
    config.port = 0;
    config.shutdown_timeout = Duration::from_secs(2);
    config.tasks.idle_reap_interval = Duration::from_millis(100);
    config.tasks.blacklist_sweep_interval = Duration::from_millis(100);
    config.tasks.qps_sample_interval = Duration::from_millis(200);
    config
}

/// A running proxy in front of a `MockBackend`.
pub struct TestContext {
    pub state: Arc<ProxyState>,
    pub backend: Arc<MockBackend>,
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let backend = Arc::new(MockBackend::new());
        let state = Arc::new(ProxyState::with_backend(config, backend.clone()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_state = state.clone();
        let server = tokio::spawn(async move {
            server::serve(listener, server_state, async {
                shutdown_rx.await.ok();
            })
            .await;
        });

        Self {
            state,
            backend,
            addr,
            shutdown_tx: Some(shutdown_tx),
            server: Some(server),
        }
    }

    pub async fn client(&self) -> TestClient {
        TestClient::connect(self.addr).await
    }

    /// Stops the proxy and waits for its drain to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            server.await.expect("Proxy task panicked");
        }
    }

    /// Polls until `condition` holds or `timeout` passes.
    pub async fn wait_until(
        &self,
        timeout: Duration,
        condition: impl Fn(&ProxyState) -> bool,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if condition(&self.state) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition(&self.state)
    }
}

/// A plain RESP client.
pub struct TestClient {
    framed: Framed<TcpStream, RespFrameCodec>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr)
            .await
            .expect("Failed to connect to the proxy");
        Self {
            framed: Framed::new(stream, RespFrameCodec),
        }
    }

    /// Sends one request and waits for its reply.
    pub async fn send(&mut self, parts: &[&str]) -> RespFrame {
        let frame = RespFrame::Array(
            parts
                .iter()
                .map(|p| RespFrame::BulkString(Bytes::from(p.to_string())))
                .collect(),
        );
        self.framed.send(frame).await.expect("Failed to send request");
        self.read().await.expect("Connection closed before a reply arrived")
    }

    /// Writes raw bytes without framing them.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        use tokio::io::AsyncWriteExt;
        self.framed
            .get_mut()
            .write_all(bytes)
            .await
            .expect("Failed to write raw bytes");
    }

    /// Reads the next reply. `None` once the proxy has closed the connection.
    pub async fn read(&mut self) -> Option<RespFrame> {
        match tokio::time::timeout(Duration::from_secs(5), self.framed.next()).await {
            Ok(Some(Ok(frame))) => Some(frame),
            Ok(Some(Err(_))) | Ok(None) => None,
            Err(_) => panic!("Timed out waiting for a reply"),
        }
    }

    /// True once the proxy has closed this connection.
    pub async fn is_closed(&mut self) -> bool {
        self.read().await.is_none()
    }
}

pub fn bulk(s: &str) -> RespFrame {
    RespFrame::BulkString(Bytes::from(s.to_string()))
}

pub fn error_text(frame: &RespFrame) -> &str {
    match frame {
        RespFrame::Error(e) => e,
        other => panic!("expected an error reply, got {other:?}"),
    }
}
