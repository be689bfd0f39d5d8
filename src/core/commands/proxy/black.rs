// src/core/commands/proxy/black.rs

//! `PROXY BLACK GET | SET <seconds> <key> | REMOVE <key>`.

use super::lowercase;
use crate::core::ProxyError;
use crate::core::protocol::RespFrame;
use crate::core::state::ProxyState;
use bytes::Bytes;
use std::time::Duration;
use tracing::{info, warn};

/// Longest time a key may be blacked for, in seconds.
pub const MAX_BLACK_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq)]
pub enum BlackSubcommand {
    Get,
    Set { seconds: u64, key: Bytes },
    Remove(Bytes),
}

impl BlackSubcommand {
    pub fn parse(args: &[Bytes]) -> Result<Self, ProxyError> {
        let Some((sub, rest)) = args.split_first() else {
            return Err(ProxyError::WrongArgumentCount("proxy black".into()));
        };
        match lowercase(sub).as_str() {
            "get" => match rest {
                [] => Ok(BlackSubcommand::Get),
                _ => Err(ProxyError::WrongArgumentCount("proxy black get".into())),
            },
            "set" => match rest {
                [seconds, key] => Ok(BlackSubcommand::Set {
                    seconds: parse_seconds(seconds, key)?,
                    key: key.clone(),
                }),
                _ => Err(ProxyError::WrongArgumentCount("proxy black set".into())),
            },
            "remove" => match rest {
                [key] => Ok(BlackSubcommand::Remove(key.clone())),
                _ => Err(ProxyError::WrongArgumentCount("proxy black remove".into())),
            },
            other => Err(ProxyError::UnknownAdminOperation(format!("black {other}"))),
        }
    }

    pub fn execute(&self, state: &ProxyState) -> Result<RespFrame, ProxyError> {
        match self {
            BlackSubcommand::Get => Ok(RespFrame::Array(
                state
                    .black_keys
                    .live_keys()
                    .into_iter()
                    .map(RespFrame::BulkString)
                    .collect(),
            )),
            BlackSubcommand::Set { seconds, key } => {
                state
                    .black_keys
                    .insert(key.clone(), Duration::from_secs(*seconds));
                info!(
                    "Blacked key '{}' for {seconds}s",
                    String::from_utf8_lossy(key)
                );
                Ok(RespFrame::ok())
            }
            BlackSubcommand::Remove(key) => match state.black_keys.remove(key) {
                Some(_) => {
                    warn!("Removed black key '{}'", String::from_utf8_lossy(key));
                    Ok(RespFrame::ok())
                }
                None => Err(ProxyError::InvalidAdminValue(format!(
                    "black key '{}' not found",
                    String::from_utf8_lossy(key)
                ))),
            },
        }
    }
}

fn parse_seconds(raw: &[u8], key: &[u8]) -> Result<u64, ProxyError> {
    let seconds = std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|s| *s <= MAX_BLACK_SECS);
    seconds.ok_or_else(|| {
        warn!(
            "Rejected black time '{}' for key '{}'",
            String::from_utf8_lossy(raw),
            String::from_utf8_lossy(key)
        );
        ProxyError::InvalidAdminValue(format!("black time must be between 0 and {MAX_BLACK_SECS}"))
    })
}
