// src/core/state/mod.rs

//! Defines the central `ProxyState` struct and the shared structures it owns.

mod blackkeys;
mod core;
mod live_config;
mod registry;
mod stats;

pub use blackkeys::{BlackKeyEntry, BlackKeys};
pub use core::{LogReloadHandle, ProxyState};
pub use live_config::LiveConfig;
pub use registry::{Registration, SessionActivity, SessionInfo, SessionRegistry, ShutdownSender};
pub use stats::StatsState;
