// src/core/metrics.rs

//! Defines and registers Prometheus metrics for proxy monitoring.
//!
//! This module uses `lazy_static` so that metrics are registered once for the whole
//! process, no matter how many proxy states a test binary creates.

use lazy_static::lazy_static;
use prometheus::{
    Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder, register_histogram,
    register_int_counter, register_int_counter_vec, register_int_gauge,
};

lazy_static! {
    // --- Gauges ---
    /// Sessions currently present in the registry.
    pub static ref CONNECTED_CLIENTS: IntGauge =
        register_int_gauge!("spinelproxy_connected_clients", "Number of currently registered client sessions.").unwrap();
    /// Entries in the per-key blacklist, including expired ones not yet swept.
    pub static ref BLACKED_KEYS: IntGauge =
        register_int_gauge!("spinelproxy_blacked_keys", "Number of keys in the per-key blacklist.").unwrap();
    /// Operations per second at the last QPS sample.
    pub static ref LAST_QPS: IntGauge =
        register_int_gauge!("spinelproxy_last_qps", "Requests per second measured by the last sample.").unwrap();

    // --- Counters ---
    pub static ref CONNECTIONS_RECEIVED_TOTAL: IntCounter =
        register_int_counter!("spinelproxy_connections_received_total", "Total number of connections accepted.").unwrap();
    /// Connections closed at accept time because the registry was full.
    pub static ref CONNECTIONS_REJECTED_TOTAL: IntCounter =
        register_int_counter!("spinelproxy_connections_rejected_total", "Total number of connections refused by the max-connection guard.").unwrap();
    pub static ref COMMANDS_PROCESSED_TOTAL: IntCounter =
        register_int_counter!("spinelproxy_commands_processed_total", "Total number of requests processed.").unwrap();
    /// Requests answered with an admission error, labeled by reason.
    pub static ref COMMANDS_REJECTED_TOTAL: IntCounterVec =
        register_int_counter_vec!("spinelproxy_commands_rejected_total", "Requests rejected during admission, labeled by reason.", &["reason"]).unwrap();
    pub static ref FANOUT_SUBCALLS_TOTAL: IntCounter =
        register_int_counter!("spinelproxy_fanout_subcalls_total", "Total number of backend sub-calls issued by fan-out.").unwrap();
    pub static ref FANOUT_SUBCALL_FAILURES_TOTAL: IntCounter =
        register_int_counter!("spinelproxy_fanout_subcall_failures_total", "Fan-out sub-calls that returned an error.").unwrap();
    pub static ref IDLE_SESSIONS_REAPED_TOTAL: IntCounter =
        register_int_counter!("spinelproxy_idle_sessions_reaped_total", "Sessions closed by the idle reaper.").unwrap();

    // --- Histograms ---
    pub static ref COMMAND_LATENCY_SECONDS: Histogram =
        register_histogram!("spinelproxy_command_latency_seconds", "Latency of request processing in seconds.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# failed to encode metrics: {e}\n"))
}
