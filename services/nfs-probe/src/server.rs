//! HTTP control surface for the read probe.
//!
//! Provides endpoints for:
//! - `/api/run?interval=<ms>` - Start the read workload
//! - `/api/stop` - Stop the read workload
//! - `GET /api/metrics` - Latest one-second window
//! - `GET /api/status` - Workload state
//! - `GET /img/*` - Static files from the mount's `img/` directory
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Extension, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use read_meter::{MetricsSnapshot, Pipeline, DEFAULT_INTERVAL};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};

// ============================================================================
// Shared State
// ============================================================================

pub struct ServerState {
    pub pipeline: Pipeline,
    /// Directory served under `/img/`.
    pub image_dir: PathBuf,
    /// Absent when no Prometheus recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    /// Milliseconds between reads. Kept as text so bad values fall back to
    /// the default instead of rejecting the request.
    pub interval: Option<String>,
}

/// Interval from the `interval` query parameter.
///
/// Missing or empty means the default. Anything that is not a whole,
/// non-negative number of milliseconds is logged and also gets the default.
pub fn parse_interval(raw: Option<&str>) -> Duration {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_INTERVAL;
    };

    match raw.parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(e) => {
            warn!(interval = %raw, error = %e, "Invalid interval, using default");
            DEFAULT_INTERVAL
        }
    }
}

/// JSON body for `/api/metrics`, newline terminated.
pub fn encode_snapshot(snapshot: &MetricsSnapshot) -> Result<Vec<u8>, serde_json::Error> {
    let mut body = serde_json::to_vec(snapshot)?;
    body.push(b'\n');
    Ok(body)
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: Arc<ServerState>) -> Router {
    let images = ServeDir::new(&state.image_dir);

    Router::new()
        .route("/api/run", get(run_handler).post(run_handler))
        .route("/api/stop", get(stop_handler).post(stop_handler))
        .route("/api/metrics", get(metrics_handler))
        .route("/api/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(prometheus_handler))
        .nest_service("/img", images)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Handlers
// ============================================================================

/// /api/run - Start the workload unless one is already running
async fn run_handler(
    Extension(state): Extension<Arc<ServerState>>,
    Query(params): Query<RunQuery>,
) -> impl IntoResponse {
    let interval = parse_interval(params.interval.as_deref());

    match state.pipeline.runner().start(interval).await {
        Ok(()) => (StatusCode::OK, "success\n".to_string()),
        Err(e) => (StatusCode::BAD_REQUEST, format!("{}\n", e)),
    }
}

/// /api/stop - Stop the workload; succeeds whether or not one was running
async fn stop_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    state.pipeline.runner().stop().await;
    (StatusCode::OK, "success\n")
}

/// GET /api/metrics - Latest completed window
async fn metrics_handler(Extension(state): Extension<Arc<ServerState>>) -> Response {
    let snapshot = state.pipeline.store().current().await;
    debug!(
        avg_read_ms = snapshot.avg_read_ms,
        max_read_ms = snapshot.max_read_ms,
        min_read_ms = snapshot.min_read_ms,
        rate_per_second = snapshot.rate_per_second,
        "Serving metrics"
    );

    match encode_snapshot(&snapshot) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        // Unreachable for MetricsSnapshot today: serde_json writes non-finite
        // floats as null rather than failing.
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to Marshal data: {}\n", e),
            )
                .into_response()
        }
    }
}

/// GET /api/status - Workload state
async fn status_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    Json(state.pipeline.runner().status().await)
}

/// GET /health - Health check
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus exposition
async fn prometheus_handler(Extension(state): Extension<Arc<ServerState>>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "Prometheus exporter not installed\n").into_response(),
    }
}

/// Serve until Ctrl+C.
pub async fn run_server(state: Arc<ServerState>, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    info!(port = port, "Starting NFS probe server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_default_when_absent() {
        assert_eq!(parse_interval(None), DEFAULT_INTERVAL);
        assert_eq!(parse_interval(Some("")), DEFAULT_INTERVAL);
    }

    #[test]
    fn test_interval_parsed_as_millis() {
        assert_eq!(parse_interval(Some("250")), Duration::from_millis(250));
        assert_eq!(parse_interval(Some("0")), Duration::ZERO);
    }

    #[test]
    fn test_invalid_interval_falls_back() {
        for raw in ["abc", "-5", "1.5", "10ms"] {
            assert_eq!(parse_interval(Some(raw)), DEFAULT_INTERVAL, "{}", raw);
        }
    }

    #[test]
    fn test_encoded_snapshot_is_newline_terminated() {
        let body = encode_snapshot(&MetricsSnapshot::default()).unwrap();
        assert_eq!(body.last(), Some(&b'\n'));

        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["rate-second"], 0.0);
    }
}
