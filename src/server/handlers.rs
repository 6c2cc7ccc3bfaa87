//! Route handlers for the main listener and the metrics listener.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use super::gateway::{self, Envelope, EnvelopeError};
use super::AppState;
use crate::metrics::{MetricsRegistry, ObjectStatus};

/// Content type of every response on the main listener.
pub const RESPONSE_CONTENT_TYPE: &str = "application/json; charset=utf-8";

const NOT_FOUND: &str = "Not found";

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

fn json_response(status: StatusCode, body: Bytes) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(RESPONSE_CONTENT_TYPE),
    );
    response
}

fn error_body(message: &str) -> Bytes {
    serde_json::to_vec(&ErrorBody { error: message })
        .map(Bytes::from)
        .unwrap_or_default()
}

/// Single `{"error": ...}` response. Counted in the errors-logged metric.
fn error_response(state: &AppState, message: &str, status: StatusCode) -> Response {
    state.metrics.error_logged();
    json_response(status, error_body(message))
}

/// `GET /`
pub async fn usage(State(state): State<AppState>) -> Response {
    json_response(StatusCode::OK, state.usage.clone())
}

/// Anything the router does not know, including other methods on `/`.
pub async fn not_found(State(state): State<AppState>) -> Response {
    state.metrics.invalid_request();
    json_response(StatusCode::NOT_FOUND, error_body(NOT_FOUND))
}

/// `POST /`: validate the envelope, then run the batch.
pub async fn detect_languages(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let items = match gateway::read_envelope(&headers, body, state.body_limit).await {
        Ok(Envelope::Items(items)) => items,
        Ok(Envelope::Null) => return json_response(StatusCode::OK, Bytes::new()),
        Err(err) => return reject(&state, err),
    };

    let (envelope, status) = state.batch.process_batch(&items);
    match serde_json::to_vec(&envelope) {
        Ok(bytes) => json_response(status, Bytes::from(bytes)),
        Err(e) => {
            error!(error = %e, items = items.len(), "Error encoding response");
            error_response(&state, &e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn reject(state: &AppState, err: EnvelopeError) -> Response {
    match &err {
        EnvelopeError::ContentType { provided } => warn!(
            content_type = provided.as_deref().unwrap_or(""),
            "Client request did not set Content-Type header to application/json"
        ),
        EnvelopeError::BodyRead(e) => error!(error = %e, "Error reading request body"),
        EnvelopeError::InvalidJson(e) => warn!(error = %e, "Client request was invalid JSON"),
        EnvelopeError::MissingRequestArray => {
            warn!("Client request has no request array")
        }
    }

    if err.is_invalid_request() {
        state.metrics.invalid_request();
    }
    if err.counts_unsuccessful_object() {
        state.metrics.object_processed(ObjectStatus::Unsuccessful);
    }
    error_response(state, &err.to_string(), err.status())
}

/// `GET /metrics` on the metrics listener.
pub async fn metrics_text(State(registry): State<Arc<MetricsRegistry>>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        registry.render(),
    )
        .into_response()
}
