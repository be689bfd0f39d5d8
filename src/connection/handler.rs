// src/connection/handler.rs

//! Defines the `ConnectionHandler` which runs one client session from accept to close.

use super::guard::ConnectionGuard;
use super::session::{CloseReason, SessionPhase, SessionState};
use crate::core::ProxyError;
use crate::core::handler::command_router::{RouteResponse, Router};
use crate::core::protocol::{Incoming, RequestCodec, RespFrame};
use crate::core::state::{ProxyState, Registration, SessionActivity};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Manages the full lifecycle of a client connection.
///
/// Requests are served strictly one at a time: the next frame is not read until the reply
/// to the previous one has been written. Shutdown and kill signals are only observed while
/// waiting for a frame, so a request that is already being served always completes.
pub struct ConnectionHandler<S> {
    framed: Framed<S, RequestCodec>,
    addr: SocketAddr,
    state: Arc<ProxyState>,
    session_id: u64,
    activity: Arc<SessionActivity>,
    kill_rx: broadcast::Receiver<()>,
    global_shutdown_rx: broadcast::Receiver<()>,
    router: Router,
    session: SessionState,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Creates a handler for a session that has already been admitted into the registry.
    pub fn new(
        socket: S,
        addr: SocketAddr,
        state: Arc<ProxyState>,
        registration: Registration,
        global_shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        let Registration {
            session_id,
            activity,
            kill_rx,
        } = registration;
        let router = Router::new(state.clone(), session_id, addr);
        Self {
            framed: Framed::new(socket, RequestCodec),
            addr,
            state,
            session_id,
            activity,
            kill_rx,
            global_shutdown_rx,
            router,
            session: SessionState::new(),
        }
    }

    /// The main loop for the connection. Returns why the session ended.
    pub async fn run(&mut self) -> CloseReason {
        let _guard = ConnectionGuard::new(self.state.clone(), self.session_id, self.addr);

        while !self.session.is_closing() {
            self.session.enter(SessionPhase::Reading);
            let next = tokio::select! {
                biased;
                _ = self.global_shutdown_rx.recv() => {
                    info!("Session {} for {} stopping for shutdown.", self.session_id, self.addr);
                    self.session.close(CloseReason::Shutdown);
                    break;
                }
                _ = self.kill_rx.recv() => {
                    info!("Session {} for {} closed by the idle reaper.", self.session_id, self.addr);
                    self.session.close(CloseReason::Reaped);
                    break;
                }
                next = self.framed.next() => next,
            };

            match next {
                Some(Ok(incoming)) => {
                    self.activity.touch();
                    if let Err(e) = self.process(incoming).await {
                        log_disconnect(self.addr, &e);
                        self.session.close(CloseReason::PeerClosed);
                    }
                }
                Some(Err(e)) => {
                    log_disconnect(self.addr, &e);
                    self.session.close(CloseReason::PeerClosed);
                }
                None => {
                    debug!("Connection from {} closed by peer.", self.addr);
                    self.session.close(CloseReason::PeerClosed);
                }
            }
        }

        let reason = self
            .session
            .close_reason()
            .unwrap_or(CloseReason::PeerClosed);
        debug!(
            "Session {} for {} ended after {} replies: {reason}",
            self.session_id, self.addr, self.session.replies_written
        );
        reason
    }

    /// Serves one decoded frame and writes exactly one reply.
    async fn process(&mut self, incoming: Incoming) -> Result<(), ProxyError> {
        let response = match incoming {
            Incoming::Request(request) => {
                debug!("Session {}: Received request: {request}", self.session_id);
                self.router.route(request, &mut self.session).await
            }
            Incoming::Malformed(e) => {
                debug!("Session {}: Malformed frame: {e}", self.session_id);
                self.state.stats.record_operation();
                self.session.enter(SessionPhase::Rejected);
                RouteResponse {
                    reply: RespFrame::error(&e),
                    close: false,
                }
            }
        };

        if response.close {
            self.session.close(CloseReason::ClientQuit);
        }
        self.session.enter(SessionPhase::Writing);
        self.framed.send(response.reply).await?;
        self.session.reply_written();
        Ok(())
    }
}

fn log_disconnect(addr: SocketAddr, e: &ProxyError) {
    if is_normal_disconnect(e) {
        debug!("Connection from {addr} closed by peer: {e}");
    } else {
        warn!("Connection error for {addr}: {e}");
    }
}

/// Resets, broken pipes and EOFs are how clients usually leave.
fn is_normal_disconnect(e: &ProxyError) -> bool {
    matches!(e, ProxyError::Io(arc_err) if matches!(
        arc_err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    ))
}
