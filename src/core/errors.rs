// src/core/errors.rs

//! Defines the primary error type for the entire proxy.

use std::num::ParseIntError;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing every failure a request can run into on its way
/// through the proxy. The `Display` output of each variant is the exact text written
/// back to the client after the `-` error prefix.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The peer closed or reset the connection. Never written back to the client.
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Incomplete data in stream")]
    IncompleteData,

    /// A frame on the wire did not follow the request framing rules.
    #[error("ERR Protocol error: {0}")]
    Framing(String),

    /// An empty request or a command the proxy does not know.
    #[error("ERR bad command")]
    BadCommand,

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArgumentCount(String),

    #[error("ERR command '{0}' is forbidden by the proxy")]
    CommandForbidden(String),

    #[error("ERR key '{0}' is blacked by the proxy")]
    KeyBlocked(String),

    #[error("ERR unknown PROXY operation '{0}'")]
    UnknownAdminOperation(String),

    #[error("ERR {0}")]
    InvalidAdminValue(String),

    /// Some sub-calls of a multi-set failed. The remaining pairs were still written.
    #[error("ERR {failed} MSET failed, partial key/value {succeeded} set")]
    PartialFanOutFailure { failed: usize, succeeded: usize },

    /// The backend gateway could not complete a call (routing, transport, timeout).
    #[error("ERR backend error: {0}")]
    Backend(String),

    #[error("ERR internal proxy error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// True if this error means the client connection itself is gone.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, ProxyError::Io(_))
    }
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
impl Clone for ProxyError {
    fn clone(&self) -> Self {
        match self {
            ProxyError::Io(e) => ProxyError::Io(Arc::clone(e)),
            ProxyError::IncompleteData => ProxyError::IncompleteData,
            ProxyError::Framing(s) => ProxyError::Framing(s.clone()),
            ProxyError::BadCommand => ProxyError::BadCommand,
            ProxyError::WrongArgumentCount(s) => ProxyError::WrongArgumentCount(s.clone()),
            ProxyError::CommandForbidden(s) => ProxyError::CommandForbidden(s.clone()),
            ProxyError::KeyBlocked(s) => ProxyError::KeyBlocked(s.clone()),
            ProxyError::UnknownAdminOperation(s) => ProxyError::UnknownAdminOperation(s.clone()),
            ProxyError::InvalidAdminValue(s) => ProxyError::InvalidAdminValue(s.clone()),
            ProxyError::PartialFanOutFailure { failed, succeeded } => {
                ProxyError::PartialFanOutFailure {
                    failed: *failed,
                    succeeded: *succeeded,
                }
            }
            ProxyError::Backend(s) => ProxyError::Backend(s.clone()),
            ProxyError::Internal(s) => ProxyError::Internal(s.clone()),
        }
    }
}

impl PartialEq for ProxyError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ProxyError::Io(e1), ProxyError::Io(e2)) => e1.kind() == e2.kind(),
            (ProxyError::Framing(s1), ProxyError::Framing(s2)) => s1 == s2,
            (ProxyError::WrongArgumentCount(s1), ProxyError::WrongArgumentCount(s2)) => s1 == s2,
            (ProxyError::CommandForbidden(s1), ProxyError::CommandForbidden(s2)) => s1 == s2,
            (ProxyError::KeyBlocked(s1), ProxyError::KeyBlocked(s2)) => s1 == s2,
            (ProxyError::UnknownAdminOperation(s1), ProxyError::UnknownAdminOperation(s2)) => {
                s1 == s2
            }
            (ProxyError::InvalidAdminValue(s1), ProxyError::InvalidAdminValue(s2)) => s1 == s2,
            (
                ProxyError::PartialFanOutFailure {
                    failed: f1,
                    succeeded: s1,
                },
                ProxyError::PartialFanOutFailure {
                    failed: f2,
                    succeeded: s2,
                },
            ) => f1 == f2 && s1 == s2,
            (ProxyError::Backend(s1), ProxyError::Backend(s2)) => s1 == s2,
            (ProxyError::Internal(s1), ProxyError::Internal(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for ProxyError {
    fn from(e: std::io::Error) -> Self {
        ProxyError::Io(Arc::new(e))
    }
}

impl From<ParseIntError> for ProxyError {
    fn from(e: ParseIntError) -> Self {
        ProxyError::Framing(format!("invalid length: {e}"))
    }
}
