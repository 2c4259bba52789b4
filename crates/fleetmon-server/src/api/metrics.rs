use crate::api::{bounded_param, error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use chrono::{Duration, Utc};
use fleetmon_common::types::{format_timestamp, DeliveryPayload, SystemMetricRecord};
use fleetmon_storage::IngestOutcome;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct IngestResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
}

/// Decode and validate an ingestion body. The error is the 400 message.
fn parse_payload(body: &[u8]) -> Result<DeliveryPayload, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err("No data provided".to_string());
    }
    let payload: DeliveryPayload =
        serde_json::from_slice(body).map_err(|e| format!("Invalid payload: {e}"))?;
    if payload.agent_id.trim().is_empty() {
        return Err("Invalid payload: agent_id must not be empty".to_string());
    }
    Ok(payload)
}

pub async fn ingest(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    body: Bytes,
) -> Response {
    let payload = match parse_payload(&body) {
        Ok(p) => p,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, msg),
    };

    match state.store.ingest(&payload).await {
        Ok(outcome) => {
            let message = match outcome {
                IngestOutcome::Stored { checks } => {
                    tracing::info!(
                        trace_id = %trace_id.0,
                        agent_id = %payload.agent_id,
                        agent_name = %payload.agent_name,
                        checks,
                        "Metrics received"
                    );
                    "Metrics received"
                }
                IngestOutcome::Duplicate => "Duplicate delivery ignored",
            };
            success_response(IngestResponse {
                status: "success",
                message,
                timestamp: format_timestamp(&Utc::now()),
            })
        }
        Err(e) => {
            tracing::error!(
                trace_id = %trace_id.0,
                agent_id = %payload.agent_id,
                error = %e,
                "Error receiving metrics"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[derive(Serialize)]
struct LatestMetric {
    timestamp: String,
    cpu_percent: f64,
    memory_percent: f64,
    disk_percent: f64,
}

pub async fn latest(State(state): State<AppState>, Path(agent_id): Path<String>) -> Response {
    match state.store.latest_system_metric(&agent_id).await {
        Ok(Some(m)) => success_response(LatestMetric {
            timestamp: format_timestamp(&m.timestamp),
            cpu_percent: m.cpu_percent,
            memory_percent: m.memory_percent,
            disk_percent: m.disk_percent,
        }),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "No metrics found"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct HistoryParams {
    hours: Option<String>,
}

#[derive(Serialize)]
struct HistoryPoint {
    timestamp: String,
    cpu_percent: f64,
    memory_percent: f64,
    memory_used: u64,
    memory_total: u64,
    disk_percent: f64,
    disk_used: u64,
    disk_total: u64,
}

impl From<SystemMetricRecord> for HistoryPoint {
    fn from(m: SystemMetricRecord) -> Self {
        Self {
            timestamp: format_timestamp(&m.timestamp),
            cpu_percent: m.cpu_percent,
            memory_percent: m.memory_percent,
            memory_used: m.memory_used,
            memory_total: m.memory_total,
            disk_percent: m.disk_percent,
            disk_used: m.disk_used,
            disk_total: m.disk_total,
        }
    }
}

#[derive(Serialize)]
struct HistoryResponse {
    agent_id: String,
    hours: u64,
    metrics: Vec<HistoryPoint>,
}

/// Metrics of the last `hours` hours (default 24, 1..=720), oldest first.
pub async fn history(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Response {
    let hours = match bounded_param("hours", params.hours.as_deref(), 24, 1, 720) {
        Ok(h) => h,
        Err(resp) => return resp,
    };
    let since = Utc::now() - Duration::hours(hours as i64);

    match state.store.system_metrics_since(&agent_id, since).await {
        Ok(rows) => success_response(HistoryResponse {
            agent_id,
            hours,
            metrics: rows.into_iter().map(HistoryPoint::from).collect(),
        }),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
