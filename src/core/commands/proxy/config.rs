// src/core/commands/proxy/config.rs

//! `PROXY CONFIG GET <name>` and `PROXY CONFIG SET <name> <value>`.
//!
//! A successful set replies with the previous value, in the same shape `GET` uses.

use super::lowercase;
use crate::config::{FANOUT_PARALLELISM_RANGE, IDLE_TIMEOUT_RANGE, MAX_CONNECTIONS_RANGE};
use crate::core::ProxyError;
use crate::core::protocol::RespFrame;
use crate::core::state::ProxyState;
use bytes::Bytes;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use strum_macros::{AsRefStr, EnumIter, EnumString};
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "warning", "error"];

/// Live configuration values reachable through `PROXY CONFIG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ConfigName {
    LogLevel,
    IdleTime,
    MaxConn,
    MulParallel,
    SlaveOk,
    Metrics,
    /// Read-only: pools are sized at startup.
    PoolSize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSubcommand {
    Get(ConfigName),
    Set(ConfigName, String),
}

impl ConfigSubcommand {
    pub fn parse(args: &[Bytes]) -> Result<Self, ProxyError> {
        let Some((sub, rest)) = args.split_first() else {
            return Err(ProxyError::WrongArgumentCount("proxy config".into()));
        };
        match lowercase(sub).as_str() {
            "get" => match rest {
                [name] => Ok(ConfigSubcommand::Get(parse_name(name)?)),
                _ => Err(ProxyError::WrongArgumentCount("proxy config get".into())),
            },
            "set" => match rest {
                [name, value] => Ok(ConfigSubcommand::Set(
                    parse_name(name)?,
                    String::from_utf8_lossy(value).trim().to_string(),
                )),
                _ => Err(ProxyError::WrongArgumentCount("proxy config set".into())),
            },
            other => Err(ProxyError::UnknownAdminOperation(format!("config {other}"))),
        }
    }

    pub fn execute(&self, state: &ProxyState) -> Result<RespFrame, ProxyError> {
        match self {
            ConfigSubcommand::Get(name) => Ok(get(state, *name)),
            ConfigSubcommand::Set(name, value) => set(state, *name, value),
        }
    }
}

fn parse_name(raw: &[u8]) -> Result<ConfigName, ProxyError> {
    let name = lowercase(raw);
    ConfigName::from_str(&name)
        .map_err(|_| ProxyError::InvalidAdminValue(format!("unknown proxy config name '{name}'")))
}

fn get(state: &ProxyState, name: ConfigName) -> RespFrame {
    let live = &state.live;
    match name {
        ConfigName::LogLevel => RespFrame::BulkString(live.log_level().into()),
        ConfigName::IdleTime => RespFrame::Integer(live.idle_timeout_secs() as i64),
        ConfigName::MaxConn => RespFrame::Integer(live.max_connections() as i64),
        ConfigName::MulParallel => RespFrame::Integer(live.fanout_parallelism() as i64),
        ConfigName::SlaveOk => RespFrame::Integer(live.slave_ok() as i64),
        ConfigName::Metrics => RespFrame::BulkString(live.metrics_addr().to_string().into()),
        ConfigName::PoolSize => RespFrame::Integer(live.pool_size_per_node() as i64),
    }
}

fn set(state: &ProxyState, name: ConfigName, value: &str) -> Result<RespFrame, ProxyError> {
    let live = &state.live;
    let previous = get(state, name);
    match name {
        ConfigName::LogLevel => {
            let level = value.to_ascii_lowercase();
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ProxyError::InvalidAdminValue(format!(
                    "loglevel must be one of {}",
                    LOG_LEVELS.join(", ")
                )));
            }
            apply_log_level(state, &level)?;
            live.set_log_level(&level);
        }
        ConfigName::IdleTime => {
            live.set_idle_timeout_secs(parse_in_range("idletime", value, IDLE_TIMEOUT_RANGE)?);
        }
        ConfigName::MaxConn => {
            live.set_max_connections(parse_in_range("maxconn", value, MAX_CONNECTIONS_RANGE)?);
        }
        ConfigName::MulParallel => {
            live.set_fanout_parallelism(parse_in_range(
                "mulparallel",
                value,
                FANOUT_PARALLELISM_RANGE,
            )?);
        }
        ConfigName::SlaveOk => {
            let on = match value {
                "1" => true,
                "0" => false,
                _ => {
                    return Err(ProxyError::InvalidAdminValue(
                        "slaveok must be 0 or 1".into(),
                    ));
                }
            };
            live.set_slave_ok(on);
        }
        ConfigName::Metrics => {
            let addr: SocketAddr = value.parse().map_err(|_| {
                ProxyError::InvalidAdminValue(format!(
                    "metrics must be a socket address such as 0.0.0.0:8878, got '{value}'"
                ))
            })?;
            live.set_metrics_addr(addr);
        }
        ConfigName::PoolSize => {
            return Err(ProxyError::InvalidAdminValue("poolsize is read-only".into()));
        }
    }
    info!("PROXY CONFIG SET {} {value}", name.as_ref());
    Ok(previous)
}

fn parse_in_range<T>(name: &str, value: &str, range: RangeInclusive<T>) -> Result<T, ProxyError>
where
    T: FromStr + PartialOrd + std::fmt::Display,
{
    value
        .parse::<T>()
        .ok()
        .filter(|v| range.contains(v))
        .ok_or_else(|| {
            ProxyError::InvalidAdminValue(format!(
                "{name} must be between {} and {}",
                range.start(),
                range.end()
            ))
        })
}

/// Swaps the subscriber's filter when the proxy runs with a reload handle.
fn apply_log_level(state: &ProxyState, level: &str) -> Result<(), ProxyError> {
    let Some(handle) = &state.log_reload_handle else {
        return Ok(());
    };
    let directive = if level == "warning" { "warn" } else { level };
    let filter = EnvFilter::try_new(directive)
        .map_err(|e| ProxyError::InvalidAdminValue(format!("invalid log level: {e}")))?;
    handle.reload(filter).map_err(|e| {
        let msg = format!("Failed to reload log level: {e}");
        error!("{msg}");
        ProxyError::Internal(msg)
    })?;
    info!("Log level dynamically changed to '{level}'");
    Ok(())
}
