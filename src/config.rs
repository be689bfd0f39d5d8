// src/config.rs

//! Manages proxy configuration: loading, clamping tunables into range, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Valid range for `idle_timeout_secs`.
pub const IDLE_TIMEOUT_RANGE: RangeInclusive<u64> = 5..=300;
/// Valid range for `max_connections`.
pub const MAX_CONNECTIONS_RANGE: RangeInclusive<usize> = 100..=60_000;
/// Valid range for `fanout_parallelism`.
pub const FANOUT_PARALLELISM_RANGE: RangeInclusive<usize> = 5..=100;
/// Valid range for `pool_size_per_node`.
pub const POOL_SIZE_RANGE: RangeInclusive<usize> = 10..=300;

/// Intervals of the periodic background tasks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TasksConfig {
    /// How often idle sessions are looked for.
    #[serde(with = "humantime_serde", default = "default_idle_reap_interval")]
    pub idle_reap_interval: Duration,
    /// How often expired blacklist entries are dropped.
    #[serde(with = "humantime_serde", default = "default_blacklist_sweep_interval")]
    pub blacklist_sweep_interval: Duration,
    #[serde(with = "humantime_serde", default = "default_qps_sample_interval")]
    pub qps_sample_interval: Duration,
    /// How often the advertised node list is compared with the backend's view.
    #[serde(with = "humantime_serde", default = "default_node_refresh_interval")]
    pub node_refresh_interval: Duration,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            idle_reap_interval: default_idle_reap_interval(),
            blacklist_sweep_interval: default_blacklist_sweep_interval(),
            qps_sample_interval: default_qps_sample_interval(),
            node_refresh_interval: default_node_refresh_interval(),
        }
    }
}

fn default_idle_reap_interval() -> Duration {
    Duration::from_secs(60)
}
fn default_blacklist_sweep_interval() -> Duration {
    Duration::from_secs(30)
}
fn default_qps_sample_interval() -> Duration {
    Duration::from_secs(1)
}
fn default_node_refresh_interval() -> Duration {
    Duration::from_secs(3600)
}

/// Settings of the cluster gateway.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BackendConfig {
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    /// Bound on one request/reply exchange with a node.
    #[serde(with = "humantime_serde", default = "default_io_timeout")]
    pub io_timeout: Duration,
    /// How many MOVED/ASK redirections a single call may follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            io_timeout: default_io_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}
fn default_io_timeout() -> Duration {
    Duration::from_secs(3)
}
fn default_max_redirects() -> usize {
    5
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

impl MetricsConfig {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.addr.parse().ok()
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:8878".to_string()
}

/// The proxy configuration as read from the TOML file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Identifier reported by `PROXY INFO`.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seed nodes of the backend cluster, `host:port`.
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Allow read-only commands to be served by replicas.
    #[serde(default)]
    pub slave_ok: bool,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Sub-calls a single multi-key command may have in flight at once.
    #[serde(default = "default_fanout_parallelism")]
    pub fanout_parallelism: usize,
    #[serde(default = "default_pool_size_per_node")]
    pub pool_size_per_node: usize,
    /// How long shutdown waits for sessions and tasks to finish.
    #[serde(with = "humantime_serde", default = "default_shutdown_timeout")]
    pub shutdown_timeout: Duration,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8888
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_idle_timeout_secs() -> u64 {
    300
}
fn default_max_connections() -> usize {
    60_000
}
fn default_fanout_parallelism() -> usize {
    10
}
fn default_pool_size_per_node() -> usize {
    30
}
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: "spinelproxy".to_string(),
            name: "spinelproxy".to_string(),
            host: default_host(),
            port: default_port(),
            nodes: vec!["127.0.0.1:6379".to_string()],
            log_level: default_log_level(),
            slave_ok: false,
            idle_timeout_secs: default_idle_timeout_secs(),
            max_connections: default_max_connections(),
            fanout_parallelism: default_fanout_parallelism(),
            pool_size_per_node: default_pool_size_per_node(),
            shutdown_timeout: default_shutdown_timeout(),
            tasks: TasksConfig::default(),
            backend: BackendConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Reads, parses, clamps and validates a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{}'", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid configuration in '{}'", path.display()))
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;
        config.clamp_tunables();
        config.validate()?;
        Ok(config)
    }

    /// Lets a `RUST_LOG` filter take precedence over `log_level`, so the level reported at
    /// runtime is the one actually in effect. An empty override is ignored.
    pub fn apply_log_override(&mut self, rust_log: Option<String>) {
        if let Some(filter) = rust_log.filter(|f| !f.trim().is_empty()) {
            self.log_level = filter;
        }
    }

    /// Replaces out-of-range tunables with their defaults.
    fn clamp_tunables(&mut self) {
        self.idle_timeout_secs = clamp_or_default(
            "idle_timeout_secs",
            self.idle_timeout_secs,
            IDLE_TIMEOUT_RANGE,
            default_idle_timeout_secs(),
        );
        self.max_connections = clamp_or_default(
            "max_connections",
            self.max_connections,
            MAX_CONNECTIONS_RANGE,
            default_max_connections(),
        );
        self.fanout_parallelism = clamp_or_default(
            "fanout_parallelism",
            self.fanout_parallelism,
            FANOUT_PARALLELISM_RANGE,
            default_fanout_parallelism(),
        );
        self.pool_size_per_node = clamp_or_default(
            "pool_size_per_node",
            self.pool_size_per_node,
            POOL_SIZE_RANGE,
            default_pool_size_per_node(),
        );
        if self.backend.max_redirects == 0 {
            info!("backend.max_redirects is 0, using {}", default_max_redirects());
            self.backend.max_redirects = default_max_redirects();
        }
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(anyhow!("id cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(anyhow!("name cannot be empty"));
        }
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.nodes.is_empty() {
            return Err(anyhow!("nodes must list at least one backend node"));
        }
        if let Some(bad) = self.nodes.iter().find(|n| !n.contains(':')) {
            return Err(anyhow!("node '{bad}' is not in host:port form"));
        }
        if self.metrics.enabled && self.metrics.socket_addr().is_none() {
            return Err(anyhow!(
                "metrics.addr '{}' is not a valid socket address",
                self.metrics.addr
            ));
        }
        for (name, interval) in [
            ("tasks.idle_reap_interval", self.tasks.idle_reap_interval),
            ("tasks.blacklist_sweep_interval", self.tasks.blacklist_sweep_interval),
            ("tasks.qps_sample_interval", self.tasks.qps_sample_interval),
            ("tasks.node_refresh_interval", self.tasks.node_refresh_interval),
        ] {
            if interval.is_zero() {
                return Err(anyhow!("{name} cannot be 0"));
            }
        }
        Ok(())
    }

    /// The address the client listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn clamp_or_default<T>(name: &str, value: T, range: RangeInclusive<T>, default: T) -> T
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if range.contains(&value) {
        value
    } else {
        info!(
            "{name} = {value} is outside {}..={}, using default {default}",
            range.start(),
            range.end()
        );
        default
    }
}

/// Rewrites only the `nodes` entry of a configuration file, keeping every other key.
pub fn rewrite_nodes(path: &Path, nodes: &[String]) -> Result<()> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at '{}'", path.display()))?;
    let mut table: toml::Table = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse TOML from '{}'", path.display()))?;
    table.insert(
        "nodes".to_string(),
        toml::Value::Array(nodes.iter().cloned().map(toml::Value::String).collect()),
    );
    let rendered = toml::to_string_pretty(&table).context("Failed to serialize configuration")?;

    // Write a sibling file, then rename it over the original.
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, rendered)
        .with_context(|| format!("Failed to write '{}'", tmp_path.display()))?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        warn!("Failed to replace config file: {e}");
        return Err(e).with_context(|| format!("Failed to replace '{}'", path.display()));
    }
    Ok(())
}
