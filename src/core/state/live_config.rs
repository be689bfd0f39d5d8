// src/core/state/live_config.rs

//! Configuration values that `PROXY CONFIG SET` may change while the proxy runs.
//!
//! Scalars are atomics; the log level and node list sit behind `RwLock`s; the metrics
//! address lives in a `watch` channel so the exporter can rebind when it changes.

use crate::config::Config;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug)]
pub struct LiveConfig {
    log_level: RwLock<String>,
    idle_timeout_secs: AtomicU64,
    max_connections: AtomicUsize,
    fanout_parallelism: AtomicUsize,
    slave_ok: AtomicBool,
    pool_size_per_node: usize,
    nodes: RwLock<Vec<String>>,
    metrics_addr: watch::Sender<SocketAddr>,
}

impl LiveConfig {
    pub fn from_config(config: &Config) -> Self {
        let metrics_addr = config
            .metrics
            .socket_addr()
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8878)));
        let (metrics_tx, _) = watch::channel(metrics_addr);
        Self {
            log_level: RwLock::new(config.log_level.clone()),
            idle_timeout_secs: AtomicU64::new(config.idle_timeout_secs),
            max_connections: AtomicUsize::new(config.max_connections),
            fanout_parallelism: AtomicUsize::new(config.fanout_parallelism),
            slave_ok: AtomicBool::new(config.slave_ok),
            pool_size_per_node: config.pool_size_per_node,
            nodes: RwLock::new(config.nodes.clone()),
            metrics_addr: metrics_tx,
        }
    }

    pub fn log_level(&self) -> String {
        self.log_level.read().clone()
    }

    /// Stores the new level and returns the previous one.
    pub fn set_log_level(&self, level: &str) -> String {
        std::mem::replace(&mut *self.log_level.write(), level.to_string())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs())
    }

    pub fn idle_timeout_secs(&self) -> u64 {
        self.idle_timeout_secs.load(Ordering::Relaxed)
    }

    pub fn set_idle_timeout_secs(&self, secs: u64) -> u64 {
        self.idle_timeout_secs.swap(secs, Ordering::Relaxed)
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections.load(Ordering::Relaxed)
    }

    pub fn set_max_connections(&self, max: usize) -> usize {
        self.max_connections.swap(max, Ordering::Relaxed)
    }

    pub fn fanout_parallelism(&self) -> usize {
        self.fanout_parallelism.load(Ordering::Relaxed)
    }

    pub fn set_fanout_parallelism(&self, parallelism: usize) -> usize {
        self.fanout_parallelism.swap(parallelism, Ordering::Relaxed)
    }

    pub fn slave_ok(&self) -> bool {
        self.slave_ok.load(Ordering::Relaxed)
    }

    pub fn set_slave_ok(&self, on: bool) -> bool {
        self.slave_ok.swap(on, Ordering::Relaxed)
    }

    /// Fixed at startup; the pools are sized once.
    pub fn pool_size_per_node(&self) -> usize {
        self.pool_size_per_node
    }

    pub fn nodes(&self) -> Vec<String> {
        self.nodes.read().clone()
    }

    pub fn set_nodes(&self, nodes: Vec<String>) -> Vec<String> {
        std::mem::replace(&mut *self.nodes.write(), nodes)
    }

    pub fn metrics_addr(&self) -> SocketAddr {
        *self.metrics_addr.borrow()
    }

    pub fn set_metrics_addr(&self, addr: SocketAddr) -> SocketAddr {
        self.metrics_addr.send_replace(addr)
    }

    /// Receiver that observes every metrics address change.
    pub fn subscribe_metrics_addr(&self) -> watch::Receiver<SocketAddr> {
        self.metrics_addr.subscribe()
    }
}
