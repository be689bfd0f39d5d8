// src/core/commands/proxy/mod.rs

//! The in-band `PROXY ...` administrative command, answered entirely by the proxy.
//!
//! `PROXY INFO`, `PROXY BLACK GET|SET|REMOVE` and `PROXY CONFIG GET|SET`. Sub-operations
//! and configuration names are case-insensitive.

mod black;
mod config;
mod info;

pub use black::BlackSubcommand;
pub use config::{ConfigName, ConfigSubcommand};

use crate::core::ProxyError;
use crate::core::protocol::{Request, RespFrame};
use crate::core::state::ProxyState;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq)]
pub enum ProxyCommand {
    Info,
    Black(BlackSubcommand),
    Config(ConfigSubcommand),
}

impl ProxyCommand {
    /// Parses the arguments following `PROXY`.
    pub fn parse(args: &[Bytes]) -> Result<Self, ProxyError> {
        let Some((op, rest)) = args.split_first() else {
            return Err(ProxyError::WrongArgumentCount("proxy".into()));
        };
        match lowercase(op).as_str() {
            "info" => {
                if !rest.is_empty() {
                    return Err(ProxyError::WrongArgumentCount("proxy info".into()));
                }
                Ok(ProxyCommand::Info)
            }
            "black" => BlackSubcommand::parse(rest).map(ProxyCommand::Black),
            "config" => ConfigSubcommand::parse(rest).map(ProxyCommand::Config),
            other => Err(ProxyError::UnknownAdminOperation(other.to_string())),
        }
    }

    pub fn execute(&self, state: &ProxyState) -> Result<RespFrame, ProxyError> {
        match self {
            ProxyCommand::Info => Ok(info::proxy_info(state)),
            ProxyCommand::Black(sub) => sub.execute(state),
            ProxyCommand::Config(sub) => sub.execute(state),
        }
    }
}

/// Parses and runs one `PROXY` request. Failures become error replies.
pub fn handle(state: &ProxyState, request: &Request) -> RespFrame {
    ProxyCommand::parse(request.args())
        .and_then(|cmd| cmd.execute(state))
        .unwrap_or_else(|e| RespFrame::error(&e))
}

fn lowercase(arg: &[u8]) -> String {
    String::from_utf8_lossy(arg).to_ascii_lowercase()
}
