// src/connection/mod.rs

//! Manages the lifecycle of a single client TCP connection: framing, routing of each
//! request, and session state.

mod guard;
mod handler;
mod session;

pub use guard::ConnectionGuard;
pub use handler::ConnectionHandler;
pub use session::{CloseReason, SessionPhase, SessionState};
