pub mod agents;
pub mod metrics;

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

/// Body of every non-2xx answer.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub status: &'static str,
    pub message: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            status: "error",
            message: message.into(),
        }),
    )
        .into_response()
}

pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    version: &'static str,
    uptime_secs: i64,
}

async fn health(State(state): State<AppState>) -> Response {
    success_response(HealthResponse {
        status: "running",
        message: "fleetmon collector API",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds().max(0),
    })
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/api/v1/metrics", post(metrics::ingest))
        .route("/api/v1/metrics/{agent_id}", get(metrics::history))
        .route("/api/v1/metrics/{agent_id}/latest", get(metrics::latest))
        .route("/api/v1/agents", get(agents::list))
        .route("/api/v1/agents/{agent_id}/checks", get(agents::checks))
}

/// Parse an optional integer query parameter, clamped to `min..=max`.
pub(crate) fn bounded_param(
    name: &str,
    raw: Option<&str>,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64, Response> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(s) => s
            .parse::<i64>()
            .map(|v| v.clamp(min as i64, max as i64) as u64)
            .map_err(|_| {
                error_response(
                    StatusCode::BAD_REQUEST,
                    format!("{name} must be an integer, got '{s}'"),
                )
            }),
    }
}
