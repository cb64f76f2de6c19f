//! HTTP API over [`AnalysisService`]
//!
//! | Method | Path | |
//! |---|---|---|
//! | POST | `/api/repositories/clone` | clone intake |
//! | POST | `/api/sessions/{id}/analyze` | start analysis (202) |
//! | GET | `/api/sessions` | all sessions |
//! | GET | `/api/sessions/{id}/status` | status polling |
//! | GET | `/api/sessions/{id}/results` | full results |
//! | GET | `/api/sessions/{id}/files/{name}` | one raw artifact |
//! | DELETE | `/api/sessions/{id}` | drop session and scratch data |
//! | GET | `/api/events?session_id=` | progress as server-sent events |
//! | GET | `/health` | liveness |

mod error;
mod routes;

pub use error::{status_for, ApiError, ErrorBody};
pub use routes::{AnalysisAccepted, HealthResponse};

use crate::service::AnalysisService;
use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

pub fn router(service: Arc<AnalysisService>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/repositories/clone", post(routes::clone_repository))
        .route("/api/sessions", get(routes::list_sessions))
        .route(
            "/api/sessions/{id}",
            axum::routing::delete(routes::delete_session),
        )
        .route("/api/sessions/{id}/analyze", post(routes::start_analysis))
        .route("/api/sessions/{id}/status", get(routes::session_status))
        .route("/api/sessions/{id}/results", get(routes::session_results))
        .route("/api/sessions/{id}/files/{name}", get(routes::session_file))
        .route("/api/events", get(routes::events))
        .with_state(service)
}

/// Serves until Ctrl+C or SIGTERM
pub async fn serve(service: Arc<AnalysisService>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(address = %addr, "HTTP API listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP API shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
