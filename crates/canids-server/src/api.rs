//! HTTP and WebSocket API: pages, stream sessions, health checks and metrics

use crate::ws::WebSocketTransport;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use canids_lib::{
    health::{ComponentStatus, HealthRegistry},
    models::CategoryInfo,
    observability::StreamMetrics,
    session::{SessionContext, StreamingSession},
};
use prometheus::{Encoder, TextEncoder};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Shared application state
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: StreamMetrics,
    pub session_ctx: Arc<SessionContext>,
    pub assets_dir: PathBuf,
    next_session_id: AtomicU64,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: StreamMetrics,
        session_ctx: Arc<SessionContext>,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            session_ctx,
            assets_dir: assets_dir.into(),
            next_session_id: AtomicU64::new(1),
        }
    }

    fn next_session_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// One upgraded socket runs one session to completion
async fn stream_socket(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let session_id = state.next_session_id();
    let ctx = state.session_ctx.clone();

    ws.on_upgrade(move |socket| async move {
        let mut transport = WebSocketTransport::new(socket);
        let outcome = StreamingSession::new(session_id, ctx)
            .run(&mut transport)
            .await;
        debug!(
            session_id,
            state = ?outcome.state,
            intervals = outcome.interval_results.len(),
            "WebSocket session finished"
        );
    })
}

/// Configured categories and whether their dataset file exists
async fn categories(State(state): State<Arc<AppState>>) -> Json<Vec<CategoryInfo>> {
    Json(state.session_ctx.catalog.categories())
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Some categories still stream
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let templates = state.assets_dir.join("templates");
    let static_dir = state.assets_dir.join("static");

    Router::new()
        .route_service("/", ServeFile::new(templates.join("index.html")))
        .route_service("/attack", ServeFile::new(templates.join("attack_page.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .route("/ws", get(stream_socket))
        .route("/api/v1/categories", get(categories))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %listener.local_addr()?, "Starting API server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
