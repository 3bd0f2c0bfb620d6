//! HTTP server implementation using axum.

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use mintfeed_core::ConnectionState;
use mintfeed_feed::{FeedReader, FeedSnapshot};
use mintfeed_telemetry::Metrics;
use mintfeed_ws::StatusPublisher;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};

/// Read-only handles the handlers serve from.
#[derive(Debug, Clone)]
pub struct DashboardState {
    feed: FeedReader,
    status: StatusPublisher,
}

impl DashboardState {
    pub fn new(feed: FeedReader, status: StatusPublisher) -> Self {
        Self { feed, status }
    }
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    pub state: ConnectionState,
    pub entries: usize,
}

/// Create the axum router.
pub fn create_router(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(get_status))
        .route("/api/snapshot", get(get_snapshot))
        .route("/metrics", get(get_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn get_status(State(state): State<DashboardState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        state: state.status.current(),
        entries: state.feed.len(),
    })
}

/// Current feed, newest first.
async fn get_snapshot(State(state): State<DashboardState>) -> Json<FeedSnapshot> {
    Json(state.feed.snapshot())
}

async fn get_metrics() -> Response {
    match Metrics::render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}

/// Run the dashboard HTTP server until `shutdown` is cancelled.
pub async fn run_server(
    state: DashboardState,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> DashboardResult<()> {
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| DashboardError::Bind {
            port: config.port,
            source,
        })?;
    info!(port = config.port, "Starting dashboard server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Dashboard server stopped");
    Ok(())
}
