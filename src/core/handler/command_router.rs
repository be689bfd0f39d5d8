// src/core/handler/command_router.rs

//! Routes one admitted request to the handler that serves it.
//!
//! The `Router` runs admission, then dispatches to the backend gateway, the fan-out engine
//! or the `PROXY` admin command. Every outcome, including rejections and backend failures,
//! becomes exactly one reply frame; only the connection handler decides when a session ends.

use super::admission::{self, Verdict};
use crate::connection::{SessionPhase, SessionState};
use crate::core::ProxyError;
use crate::core::commands::{Handler, proxy};
use crate::core::fanout::FanOutEngine;
use crate::core::metrics;
use crate::core::protocol::{Request, RespFrame};
use crate::core::state::ProxyState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, info_span};

/// The reply to one request, plus whether the session ends once it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResponse {
    pub reply: RespFrame,
    pub close: bool,
}

impl RouteResponse {
    fn reply(reply: RespFrame) -> Self {
        Self {
            reply,
            close: false,
        }
    }
}

/// Per-session dispatcher. The fan-out parallelism is fixed when the session starts.
pub struct Router {
    state: Arc<ProxyState>,
    session_id: u64,
    addr: SocketAddr,
    fanout: FanOutEngine,
}

impl Router {
    pub fn new(state: Arc<ProxyState>, session_id: u64, addr: SocketAddr) -> Self {
        let fanout = FanOutEngine::new(state.backend.clone(), state.live.fanout_parallelism());
        Self {
            state,
            session_id,
            addr,
            fanout,
        }
    }

    pub fn fanout_parallelism(&self) -> usize {
        self.fanout.parallelism()
    }

    /// Admits and serves one request, moving `session` through the matching phases.
    pub async fn route(&self, request: Request, session: &mut SessionState) -> RouteResponse {
        let span = info_span!(
            "command",
            name = %request.name(),
            client.addr = %self.addr,
            client.id = %self.session_id,
        );

        async move {
            let start_time = Instant::now();
            self.state.stats.record_operation();
            metrics::COMMANDS_PROCESSED_TOTAL.inc();

            session.enter(SessionPhase::Admitting);
            let verdict = admission::admit(&self.state.commands, &self.state.black_keys, &request);
            let response = match verdict {
                Verdict::Inline {
                    reply,
                    close_after_write,
                } => {
                    session.enter(SessionPhase::InlineReply);
                    RouteResponse {
                        reply,
                        close: close_after_write,
                    }
                }
                Verdict::Reject(err) => {
                    session.enter(SessionPhase::Rejected);
                    debug!("Rejected: {err}");
                    metrics::COMMANDS_REJECTED_TOTAL
                        .with_label_values(&[rejection_reason(&err)])
                        .inc();
                    RouteResponse::reply(RespFrame::error(&err))
                }
                Verdict::Dispatch(handler) => {
                    session.enter(SessionPhase::Dispatching);
                    RouteResponse::reply(self.dispatch(handler, &request).await)
                }
            };

            metrics::COMMAND_LATENCY_SECONDS.observe(start_time.elapsed().as_secs_f64());
            response
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, handler: Handler, request: &Request) -> RespFrame {
        match handler {
            Handler::Forward => match self.state.backend.execute(request).await {
                Ok(reply) => reply,
                Err(e) => {
                    debug!("Backend call failed: {e}");
                    RespFrame::error(&e)
                }
            },
            Handler::FanOut(command) => self.fanout.execute(command, request).await,
            Handler::Admin => proxy::handle(&self.state, request),
        }
    }
}

fn rejection_reason(err: &ProxyError) -> &'static str {
    match err {
        ProxyError::BadCommand => "bad_command",
        ProxyError::CommandForbidden(_) => "forbidden",
        ProxyError::WrongArgumentCount(_) => "arity",
        ProxyError::KeyBlocked(_) => "blacked_key",
        _ => "other",
    }
}
