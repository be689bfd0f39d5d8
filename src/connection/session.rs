// src/connection/session.rs

//! Defines the state associated with a single client session.

use std::fmt;

/// Where a session is in its read / admit / dispatch / write cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Reading,
    Admitting,
    InlineReply,
    Rejected,
    Dispatching,
    Writing,
    Closing,
}

/// Why a session left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed or reset the connection.
    PeerClosed,
    /// The client asked to leave (`QUIT`).
    ClientQuit,
    /// The idle reaper removed the session.
    Reaped,
    /// The proxy is shutting down.
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::PeerClosed => "closed by peer",
            CloseReason::ClientQuit => "client quit",
            CloseReason::Reaped => "idle timeout",
            CloseReason::Shutdown => "proxy shutdown",
        };
        f.write_str(s)
    }
}

/// Holds the state specific to a single client session.
#[derive(Debug)]
pub struct SessionState {
    phase: SessionPhase,
    close_reason: Option<CloseReason>,
    /// Replies written so far.
    pub replies_written: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            phase: SessionPhase::Reading,
            close_reason: None,
            replies_written: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    pub fn is_closing(&self) -> bool {
        self.phase == SessionPhase::Closing
    }

    /// Moves to `next`. `Closing` is terminal: once entered, later transitions are ignored.
    pub(crate) fn enter(&mut self, next: SessionPhase) {
        if self.phase != SessionPhase::Closing {
            self.phase = next;
        }
    }

    /// Enters `Closing`, keeping the first reason recorded.
    pub(crate) fn close(&mut self, reason: CloseReason) {
        self.phase = SessionPhase::Closing;
        self.close_reason.get_or_insert(reason);
    }

    /// A reply was flushed; the session goes back to reading unless it is closing.
    pub(crate) fn reply_written(&mut self) {
        self.replies_written += 1;
        self.enter(SessionPhase::Reading);
    }
}
