#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use fleetmon_server::app;
use fleetmon_server::config::ServerConfig;
use fleetmon_server::state::AppState;
use fleetmon_storage::MetricStore;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub async fn build_test_context() -> Result<TestContext> {
    fleetmon_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let config = ServerConfig {
        data_dir: temp_dir.path().to_string_lossy().to_string(),
        ..ServerConfig::default()
    };
    let store = MetricStore::new(&config.connection_url()).await?;
    let state = AppState::new(store, config);
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

/// Send `body` verbatim and decode the JSON answer.
pub async fn request_raw(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Body,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(body)
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Value,
) -> (StatusCode, Value, Option<String>) {
    request_raw(app, method, uri, Body::from(body.to_string())).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
) -> (StatusCode, Value, Option<String>) {
    request_raw(app, method, uri, Body::empty()).await
}

pub fn assert_err_envelope(body: &Value) {
    assert_eq!(body["status"], "error", "unexpected body: {body}");
    assert!(body["message"].is_string(), "unexpected body: {body}");
}

/// A delivery as an agent would send it.
pub fn make_payload(agent_id: &str, agent_name: &str, timestamp: &str, cpu: f64) -> Value {
    json!({
        "agent_id": agent_id,
        "agent_name": agent_name,
        "timestamp": timestamp,
        "system": {
            "cpu_percent": cpu,
            "memory": {"total": 8000, "available": 3200, "used": 4800, "percent": 60.0},
            "disk": {"total": 100000, "used": 25000, "free": 75000, "percent": 25.0}
        },
        "network": [
            {"host": "8.8.8.8", "port": 53, "status": "up", "latency_ms": 12.3},
            {"url": "https://www.google.com", "status": "down", "error": "timed out"}
        ]
    })
}
