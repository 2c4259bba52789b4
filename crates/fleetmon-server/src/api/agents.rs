use crate::api::{bounded_param, error_response, success_response};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use fleetmon_common::types::{format_timestamp, AgentSummary, NetworkCheckRecord};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct AgentView {
    agent_id: String,
    agent_name: String,
    status: String,
    last_seen: Option<String>,
}

impl From<AgentSummary> for AgentView {
    fn from(a: AgentSummary) -> Self {
        Self {
            agent_id: a.agent_id,
            agent_name: a.agent_name,
            status: a.status.to_string(),
            last_seen: a.last_seen.as_ref().map(format_timestamp),
        }
    }
}

#[derive(Serialize)]
struct AgentList {
    agents: Vec<AgentView>,
}

/// Every known agent, most recently seen first.
pub async fn list(State(state): State<AppState>) -> Response {
    match state.store.list_agents().await {
        Ok(agents) => success_response(AgentList {
            agents: agents.into_iter().map(AgentView::from).collect(),
        }),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct ChecksParams {
    limit: Option<String>,
}

#[derive(Serialize)]
struct CheckView {
    timestamp: String,
    target: String,
    check_type: String,
    status: String,
    latency_ms: Option<f64>,
    error_message: Option<String>,
}

impl From<NetworkCheckRecord> for CheckView {
    fn from(c: NetworkCheckRecord) -> Self {
        Self {
            timestamp: format_timestamp(&c.timestamp),
            target: c.target,
            check_type: c.check_type,
            status: c.status,
            latency_ms: c.latency_ms,
            error_message: c.error_message,
        }
    }
}

#[derive(Serialize)]
struct CheckList {
    agent_id: String,
    checks: Vec<CheckView>,
}

/// Latest network checks of one agent (default 50, at most 500).
pub async fn checks(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(params): Query<ChecksParams>,
) -> Response {
    let limit = match bounded_param("limit", params.limit.as_deref(), 50, 1, 500) {
        Ok(l) => l,
        Err(resp) => return resp,
    };

    match state.store.recent_network_checks(&agent_id, limit).await {
        Ok(rows) => success_response(CheckList {
            agent_id,
            checks: rows.into_iter().map(CheckView::from).collect(),
        }),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
