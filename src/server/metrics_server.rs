// src/server/metrics_server.rs

use crate::core::metrics::{self, gather_metrics};
use crate::core::state::ProxyState;
use axum::extract::State;
use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tracing::{error, info};

/// Handles HTTP requests to the /metrics endpoint.
async fn metrics_handler(State(state): State<Arc<ProxyState>>) -> impl IntoResponse {
    metrics::CONNECTED_CLIENTS.set(state.sessions.len() as i64);
    metrics::BLACKED_KEYS.set(state.black_keys.len() as i64);

    let body = gather_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
}

/// Serves Prometheus metrics on `/metrics` at the live `metrics` address, moving to the new
/// address whenever `PROXY CONFIG SET metrics` changes it.
pub async fn run_metrics_server(state: Arc<ProxyState>, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut addr_rx = state.live.subscribe_metrics_addr();

    loop {
        let addr = *addr_rx.borrow_and_update();
        let listener = match TcpListener::bind(addr).await {
            Ok(l) => Some(l),
            Err(e) => {
                error!("Failed to bind metrics server on {addr}: {e}");
                None
            }
        };

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = listener.map(|listener| {
            info!("Prometheus metrics server listening on http://{addr}/metrics");
            let app = Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(state.clone());
            tokio::spawn(
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        stop_rx.await.ok();
                    })
                    .into_future(),
            )
        });

        // A failed bind waits here too, for a new address or for shutdown.
        let shutting_down = tokio::select! {
            _ = shutdown_rx.recv() => true,
            changed = addr_rx.changed() => changed.is_err(),
        };

        let _ = stop_tx.send(());
        if let Some(server) = server {
            match server.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Metrics server on {addr} failed: {e}"),
                Err(e) => error!("Metrics server task on {addr} panicked: {e}"),
            }
        }

        if shutting_down {
            info!("Metrics server shutting down.");
            return;
        }
        info!("Metrics address changed; restarting the metrics server.");
    }
}
