//! HTTP surface: landing page, pairing QR image, static assets, health and the bridge webhook

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, warn};

use crate::models::{BridgeEvent, InboundMessage};
use crate::relay::{Relay, RelayStatus};

#[derive(Clone)]
pub struct WebState {
    pub relay: Arc<Relay>,
    pub inbound: mpsc::Sender<InboundMessage>,
    /// Bridge session whose events are accepted
    pub session: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub relay: RelayStatus,
}

/// Files served as-is
#[derive(Debug, Clone)]
pub struct StaticFiles {
    pub landing_page: PathBuf,
    pub qr_image: PathBuf,
    /// Directory for any other asset the landing page references
    pub public_dir: PathBuf,
}

pub fn router(state: WebState, files: &StaticFiles) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(&files.landing_page))
        .route_service("/qr", ServeFile::new(&files.qr_image))
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .fallback_service(ServeDir::new(&files.public_dir))
        .with_state(state)
}

/// Serve `app` until `shutdown` resolves, then finish in-flight requests
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("web server stopped")
}

async fn health(State(state): State<WebState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        relay: state.relay.status().await,
    })
}

async fn webhook(State(state): State<WebState>, Json(event): Json<BridgeEvent>) -> StatusCode {
    if let Some(session) = &event.session {
        if *session != state.session {
            debug!("Ignoring event for session {}", session);
            return StatusCode::OK;
        }
    }

    let Some(message) = event.into_inbound() else {
        return StatusCode::OK;
    };

    match state.inbound.send(message).await {
        Ok(()) => StatusCode::OK,
        Err(_) => {
            warn!("Relay loop is not running, dropping inbound message");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
