// src/core/fanout/merge.rs

//! Merge policies: how per-position sub-call outcomes become one client reply.
//! Every function reads the outcomes in input order.

use crate::core::ProxyError;
use crate::core::protocol::RespFrame;

/// The outcome of one sub-call, stored at its input position.
pub type Outcome = Result<RespFrame, ProxyError>;

/// True if the outcome counts as a failed sub-call. A null reply is not a failure.
pub fn is_failure(outcome: &Outcome) -> bool {
    match outcome {
        Ok(frame) => frame.is_error(),
        Err(_) => true,
    }
}

/// An array of the individual replies. Transport failures become error elements.
pub fn merge_mget(outcomes: Vec<Outcome>) -> RespFrame {
    RespFrame::Array(
        outcomes
            .into_iter()
            .map(|outcome| outcome.unwrap_or_else(|e| RespFrame::error(&e)))
            .collect(),
    )
}

/// `+OK` when every pair was set, otherwise the failure and success counts.
pub fn merge_mset(outcomes: Vec<Outcome>) -> RespFrame {
    let total = outcomes.len();
    let failed = outcomes.iter().filter(|o| is_failure(o)).count();
    if failed == 0 {
        RespFrame::ok()
    } else {
        RespFrame::error(&ProxyError::PartialFanOutFailure {
            failed,
            succeeded: total - failed,
        })
    }
}

/// The sum of the per-key delete counts. Anything but an integer reply counts as zero.
/// Counts come off the wire, so the sum saturates instead of overflowing.
pub fn merge_del(outcomes: Vec<Outcome>) -> RespFrame {
    let deleted = outcomes
        .iter()
        .map(|outcome| match outcome {
            Ok(RespFrame::Integer(n)) => *n,
            _ => 0,
        })
        .fold(0i64, i64::saturating_add);
    RespFrame::Integer(deleted)
}
