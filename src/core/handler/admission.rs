// src/core/handler/admission.rs

//! Decides, for one parsed request, whether it is answered inline, rejected, or dispatched.
//!
//! Evaluation order, each step short-circuiting:
//! empty request, protocol housekeeping (`PING`, `QUIT`, `SELECT`, `AUTH`, `ECHO`),
//! forbidden commands, unknown commands, arity, and finally the per-key blacklist.

use crate::core::ProxyError;
use crate::core::commands::{CommandTable, Handler};
use crate::core::protocol::{Request, RespFrame};
use crate::core::state::BlackKeys;

/// The outcome of admission.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Fully handled without the backend.
    Inline {
        reply: RespFrame,
        close_after_write: bool,
    },
    /// Refused with an error reply. The session stays open.
    Reject(ProxyError),
    /// Admissible; serve it with this handler.
    Dispatch(Handler),
}

impl Verdict {
    fn inline(reply: RespFrame) -> Self {
        Verdict::Inline {
            reply,
            close_after_write: false,
        }
    }
}

/// Runs the admission chain over `request`.
pub fn admit(commands: &CommandTable, black_keys: &BlackKeys, request: &Request) -> Verdict {
    if request.is_empty() {
        return Verdict::Reject(ProxyError::BadCommand);
    }

    let name = request.name();
    if let Some(verdict) = housekeeping(name, request) {
        return verdict;
    }

    if commands.is_forbidden(name) {
        return Verdict::Reject(ProxyError::CommandForbidden(name.to_ascii_lowercase()));
    }

    let Some(entry) = commands.lookup(name) else {
        return Verdict::Reject(ProxyError::BadCommand);
    };

    if !entry.accepts(request.len()) {
        return Verdict::Reject(ProxyError::WrongArgumentCount(name.to_ascii_lowercase()));
    }

    if entry.is_keyed()
        && let Some(key) = request.args().first()
        && black_keys.is_blocked(key)
    {
        return Verdict::Reject(ProxyError::KeyBlocked(
            String::from_utf8_lossy(key).into_owned(),
        ));
    }

    Verdict::Dispatch(entry.handler)
}

/// Commands answered by the proxy itself regardless of the dispatch table.
fn housekeeping(name: &str, request: &Request) -> Option<Verdict> {
    let verdict = match name {
        "PING" => Verdict::inline(RespFrame::SimpleString("PONG".into())),
        "QUIT" => Verdict::Inline {
            reply: RespFrame::ok(),
            close_after_write: true,
        },
        // A single logical database and no authentication of its own.
        "SELECT" | "AUTH" => Verdict::inline(RespFrame::ok()),
        "ECHO" => match request.args() {
            [message] => Verdict::inline(RespFrame::SimpleString(single_line(message))),
            _ => Verdict::Reject(ProxyError::WrongArgumentCount("echo".into())),
        },
        _ => return None,
    };
    Some(verdict)
}

/// A simple-string reply cannot contain CR or LF.
fn single_line(message: &[u8]) -> String {
    String::from_utf8_lossy(message).replace(['\r', '\n'], " ")
}
