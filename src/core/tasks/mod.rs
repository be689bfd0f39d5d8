// src/core/tasks/mod.rs

//! Long-running background tasks: session and blacklist housekeeping, throughput sampling
//! and node list maintenance. Each one runs until the shutdown broadcast fires.

pub mod blackkey_sweeper;
pub mod idle_reaper;
pub mod node_refresher;
pub mod qps_sampler;
