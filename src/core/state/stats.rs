// src/core/state/stats.rs

//! Contains state definitions and logic for proxy statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Proxy-wide counters. The operation counter is drained by the QPS sampler; the rest only grow.
#[derive(Debug, Default)]
pub struct StatsState {
    /// The total number of connections accepted since startup.
    total_connections: AtomicU64,
    /// Connections closed at accept time because the registry was full.
    rejected_connections: AtomicU64,
    /// The total number of requests read since startup.
    total_commands: AtomicU64,
    /// Requests read since the last QPS sample.
    ops_since_sample: AtomicU64,
    /// Operations per second computed by the last sample.
    last_qps: AtomicU64,
}

impl StatsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_total_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    pub fn increment_rejected_connections(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_rejected_connections(&self) -> u64 {
        self.rejected_connections.load(Ordering::Relaxed)
    }

    /// Counts one request read from a client.
    pub fn record_operation(&self) {
        self.total_commands.fetch_add(1, Ordering::Relaxed);
        self.ops_since_sample.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total_commands(&self) -> u64 {
        self.total_commands.load(Ordering::Relaxed)
    }

    /// Resets the per-sample operation counter and stores the rate over `elapsed_secs`.
    /// Returns the stored rate.
    pub fn sample_qps(&self, elapsed_secs: f64) -> u64 {
        let ops = self.ops_since_sample.swap(0, Ordering::Relaxed);
        let qps = if elapsed_secs > 0.0 {
            (ops as f64 / elapsed_secs).round() as u64
        } else {
            ops
        };
        self.last_qps.store(qps, Ordering::Relaxed);
        qps
    }

    pub fn last_qps(&self) -> u64 {
        self.last_qps.load(Ordering::Relaxed)
    }
}
