// src/core/mod.rs

//! The central module containing the request pipeline of the proxy: framing, admission,
//! dispatch, fan-out and the shared state behind them.

pub mod backend;
pub mod commands;
pub mod errors;
pub mod fanout;
pub mod handler;
pub mod metrics;
pub mod protocol;
pub mod state;
pub mod tasks;

pub use errors::ProxyError;
pub use protocol::{Request, RespFrame};
