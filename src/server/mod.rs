//! HTTP surface: router construction, shared state, request accounting.

pub mod gateway;
pub mod handlers;
pub mod usage;

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::middleware::{self as axum_mw, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::metrics::{MetricsRegistry, MetricsSink};
use crate::pipeline::BatchProcessor;

/// State shared by every request on the main listener.
#[derive(Clone)]
pub struct AppState {
    pub batch: Arc<BatchProcessor>,
    pub metrics: Arc<dyn MetricsSink>,
    /// Pre-rendered usage document.
    pub usage: Bytes,
    pub body_limit: usize,
}

impl AppState {
    pub fn new(
        batch: BatchProcessor,
        metrics: Arc<dyn MetricsSink>,
        body_limit: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            batch: Arc::new(batch),
            metrics,
            usage: usage::render()?,
            body_limit,
        })
    }
}

/// Build the main router: usage, detection, and a JSON 404 for the rest.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::usage)
                .post(handlers::detect_languages)
                .fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        .layer(axum_mw::from_fn_with_state(state.clone(), track_request))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request| {
                tracing::info_span!(
                    "request",
                    request_id = %uuid::Uuid::new_v4(),
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            }),
        )
        .with_state(state)
}

/// Build the metrics router, served on its own port.
pub fn build_metrics_router(registry: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(handlers::metrics_text))
        .with_state(registry)
}

/// Counts every request and its duration, whatever route handled it.
async fn track_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.metrics.request_finished(start.elapsed());
    response
}

/// Serve `app` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
