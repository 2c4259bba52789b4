#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use fleetmon_agent::MetricsAssembler;
use fleetmon_collector::network::ReachabilityChecker;
use fleetmon_collector::{CollectionError, ResourceSampler};
use fleetmon_common::types::{DeliveryPayload, DiskUsage, MemoryUsage, SystemSnapshot};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Collector stand-in that counts attempts and keeps every accepted body.
#[derive(Clone)]
pub struct StubCollector {
    pub attempts: Arc<AtomicUsize>,
    pub received: Arc<Mutex<Vec<DeliveryPayload>>>,
    /// Requests answered after the configured delay.
    pub responded: Arc<AtomicUsize>,
    status: StatusCode,
    delay: Duration,
}

impl StubCollector {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn responded(&self) -> usize {
        self.responded.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<DeliveryPayload> {
        self.received.lock().unwrap().clone()
    }
}

async fn ingest(State(stub): State<StubCollector>, body: String) -> (StatusCode, &'static str) {
    stub.attempts.fetch_add(1, Ordering::SeqCst);
    if let Ok(payload) = serde_json::from_str::<DeliveryPayload>(&body) {
        stub.received.lock().unwrap().push(payload);
    }
    tokio::time::sleep(stub.delay).await;
    stub.responded.fetch_add(1, Ordering::SeqCst);
    (stub.status, "{}")
}

/// Serve a stub collector answering every POST with `status`. Returns the
/// metrics endpoint URL.
pub async fn spawn_collector(status: StatusCode) -> (String, StubCollector) {
    spawn_slow_collector(status, Duration::ZERO).await
}

/// Like [`spawn_collector`], holding every answer back for `delay`.
pub async fn spawn_slow_collector(status: StatusCode, delay: Duration) -> (String, StubCollector) {
    let stub = StubCollector {
        attempts: Arc::new(AtomicUsize::new(0)),
        received: Arc::new(Mutex::new(Vec::new())),
        responded: Arc::new(AtomicUsize::new(0)),
        status,
        delay,
    };
    let app = Router::new()
        .route("/api/v1/metrics", post(ingest))
        .with_state(stub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api/v1/metrics"), stub)
}

/// Endpoint on a port nothing listens on.
pub async fn refused_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api/v1/metrics")
}

pub fn snapshot(cpu: f64) -> SystemSnapshot {
    SystemSnapshot {
        cpu_percent: cpu,
        memory: MemoryUsage {
            total: 1000,
            available: 400,
            used: 600,
            percent: 60.0,
        },
        disk: DiskUsage {
            total: 2000,
            used: 500,
            free: 1500,
            percent: 25.0,
        },
    }
}

/// Sampler returning a fixed snapshot, optionally failing or panicking on
/// selected calls (1-based).
pub struct FakeSampler {
    pub calls: Arc<AtomicUsize>,
    pub fail_on: Vec<usize>,
    pub panic_on: Vec<usize>,
}

impl FakeSampler {
    pub fn steady() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_on: vec![],
            panic_on: vec![],
        }
    }
}

#[async_trait]
impl ResourceSampler for FakeSampler {
    async fn sample(&mut self) -> Result<SystemSnapshot, CollectionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_on.contains(&call) {
            panic!("sampler blew up on call {call}");
        }
        if self.fail_on.contains(&call) {
            return Err(CollectionError::NoCpu);
        }
        Ok(snapshot(42.0))
    }
}

pub fn assembler(sampler: FakeSampler) -> MetricsAssembler {
    MetricsAssembler::new(
        "h1",
        "Host1",
        Box::new(sampler),
        ReachabilityChecker::new(Duration::from_millis(200), Duration::from_millis(200)),
        vec![],
    )
}
