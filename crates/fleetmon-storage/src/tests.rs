use crate::entities::{agent, alert, network_check, system_metric};
use crate::error::StorageError;
use crate::{IngestOutcome, MetricStore};
use chrono::{Duration, TimeZone, Utc};
use fleetmon_common::types::{
    AgentStatus, DeliveryPayload, DiskUsage, HostCheck, HostStatus, MemoryUsage, NetworkCheck,
    SystemSnapshot, UrlCheck, UrlStatus,
};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};
use tempfile::TempDir;

async fn setup() -> (TempDir, MetricStore) {
    fleetmon_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("monitoring.db").display()
    );
    let store = MetricStore::new(&url).await.unwrap();
    (dir, store)
}

fn payload(agent_id: &str, cpu: f64, network: Vec<NetworkCheck>) -> DeliveryPayload {
    DeliveryPayload {
        agent_id: agent_id.to_string(),
        agent_name: format!("{agent_id}-name"),
        timestamp: Utc::now(),
        delivery_id: None,
        system: SystemSnapshot {
            cpu_percent: cpu,
            memory: MemoryUsage {
                total: 8_000,
                available: 3_200,
                used: 4_800,
                percent: 60.0,
            },
            disk: DiskUsage {
                total: 100_000,
                used: 25_000,
                free: 75_000,
                percent: 25.0,
            },
        },
        network,
    }
}

fn two_checks() -> Vec<NetworkCheck> {
    vec![
        NetworkCheck::Host(HostCheck {
            host: "8.8.8.8".into(),
            port: 53,
            status: HostStatus::Up,
            latency_ms: Some(12.5),
            error: None,
        }),
        NetworkCheck::Url(UrlCheck {
            url: "https://example.com".into(),
            status_code: None,
            status: UrlStatus::Down,
            latency_ms: None,
            error: Some("connection refused".into()),
        }),
    ]
}

#[tokio::test]
async fn ingest_creates_agent_metric_and_checks() {
    let (_dir, store) = setup().await;

    let outcome = store.ingest(&payload("h1", 42.0, two_checks())).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Stored { checks: 2 });

    let agents = store.list_agents().await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].agent_id, "h1");
    assert_eq!(agents[0].agent_name, "h1-name");
    assert_eq!(agents[0].status, AgentStatus::Active);
    assert!(agents[0].last_seen.is_some());

    assert_eq!(store.count_system_metrics("h1").await.unwrap(), 1);
    assert_eq!(store.count_network_checks("h1").await.unwrap(), 2);
}

#[tokio::test]
async fn repeated_ingest_keeps_one_agent_and_refreshes_last_seen() {
    let (_dir, store) = setup().await;

    store.ingest(&payload("web-01", 10.0, vec![])).await.unwrap();
    let first = store.get_agent("web-01").await.unwrap().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let mut second = payload("web-01", 20.0, vec![]);
    second.agent_name = "renamed".into();
    store.ingest(&second).await.unwrap();

    assert_eq!(store.count_agents().await.unwrap(), 1);
    let refreshed = store.get_agent("web-01").await.unwrap().unwrap();
    assert!(refreshed.last_seen > first.last_seen);
    // name is only written on creation
    assert_eq!(refreshed.agent_name, "web-01-name");
    assert_eq!(store.count_system_metrics("web-01").await.unwrap(), 2);
}

#[tokio::test]
async fn latest_metric_matches_ingested_values() {
    let (_dir, store) = setup().await;

    let mut older = payload("h1", 10.0, vec![]);
    older.timestamp = Utc::now() - Duration::minutes(5);
    store.ingest(&older).await.unwrap();
    store.ingest(&payload("h1", 42.0, vec![])).await.unwrap();

    let latest = store.latest_system_metric("h1").await.unwrap().unwrap();
    assert_eq!(latest.cpu_percent, 42.0);
    assert_eq!(latest.memory_percent, 60.0);
    assert_eq!(latest.disk_percent, 25.0);
    assert_eq!(latest.memory_total, 8_000);
    assert_eq!(latest.disk_used, 25_000);
}

#[tokio::test]
async fn latest_metric_uses_record_timestamp_not_arrival_order() {
    let (_dir, store) = setup().await;

    store.ingest(&payload("h1", 42.0, vec![])).await.unwrap();
    let mut late = payload("h1", 99.0, vec![]);
    late.timestamp = Utc::now() - Duration::hours(1);
    store.ingest(&late).await.unwrap();

    let latest = store.latest_system_metric("h1").await.unwrap().unwrap();
    assert_eq!(latest.cpu_percent, 42.0);
}

#[tokio::test]
async fn latest_metric_for_unknown_agent_is_none() {
    let (_dir, store) = setup().await;
    assert!(store.latest_system_metric("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn empty_network_list_stores_metric_only() {
    let (_dir, store) = setup().await;

    let outcome = store.ingest(&payload("h1", 5.0, vec![])).await.unwrap();
    assert_eq!(outcome, IngestOutcome::Stored { checks: 0 });
    assert_eq!(store.count_system_metrics("h1").await.unwrap(), 1);
    assert_eq!(store.count_network_checks("h1").await.unwrap(), 0);
}

#[tokio::test]
async fn failed_ingest_rolls_back_every_row() {
    let (_dir, store) = setup().await;

    store
        .db()
        .execute_unprepared("DROP TABLE network_checks;")
        .await
        .unwrap();

    let result = store.ingest(&payload("h1", 42.0, two_checks())).await;
    assert!(result.is_err());

    assert_eq!(agent::Entity::find().count(store.db()).await.unwrap(), 0);
    assert_eq!(
        system_metric::Entity::find().count(store.db()).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn duplicate_delivery_is_ignored() {
    let (_dir, store) = setup().await;

    let mut p = payload("h1", 42.0, two_checks());
    p.delivery_id = Some(fleetmon_common::id::next_id());

    assert_eq!(
        store.ingest(&p).await.unwrap(),
        IngestOutcome::Stored { checks: 2 }
    );
    assert_eq!(store.ingest(&p).await.unwrap(), IngestOutcome::Duplicate);

    assert_eq!(store.count_system_metrics("h1").await.unwrap(), 1);
    assert_eq!(store.count_network_checks("h1").await.unwrap(), 2);
}

#[tokio::test]
async fn history_is_filtered_by_window_and_ascending() {
    let (_dir, store) = setup().await;
    let now = Utc::now();

    for (cpu, hours_ago) in [(1.0, 30), (2.0, 3), (3.0, 1)] {
        let mut p = payload("h1", cpu, vec![]);
        p.timestamp = now - Duration::hours(hours_ago);
        store.ingest(&p).await.unwrap();
    }

    let rows = store
        .system_metrics_since("h1", now - Duration::hours(24))
        .await
        .unwrap();
    let cpus: Vec<f64> = rows.iter().map(|r| r.cpu_percent).collect();
    assert_eq!(cpus, vec![2.0, 3.0]);
}

#[tokio::test]
async fn recent_checks_are_newest_first_and_limited() {
    let (_dir, store) = setup().await;
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

    for minute in 0..3 {
        let mut p = payload("h1", 1.0, two_checks());
        p.timestamp = base + Duration::minutes(minute);
        store.ingest(&p).await.unwrap();
    }

    let checks = store.recent_network_checks("h1", 4).await.unwrap();
    assert_eq!(checks.len(), 4);
    assert_eq!(checks[0].timestamp, base + Duration::minutes(2));
    assert!(checks.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

    let targets: Vec<&str> = checks[..2].iter().map(|c| c.target.as_str()).collect();
    assert!(targets.contains(&"8.8.8.8:53"));
    assert!(targets.contains(&"https://example.com"));
    let down = checks.iter().find(|c| c.check_type == "url").unwrap();
    assert_eq!(down.status, "down");
    assert_eq!(down.error_message.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn agents_are_listed_by_last_seen_descending() {
    let (_dir, store) = setup().await;

    store.ingest(&payload("a", 1.0, vec![])).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    store.ingest(&payload("b", 1.0, vec![])).await.unwrap();

    let ids: Vec<String> = store
        .list_agents()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.agent_id)
        .collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[tokio::test]
async fn unusable_data_dir_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let url = format!("sqlite://{}/monitoring.db?mode=rwc", blocker.display());

    let err = MetricStore::new(&url).await.err().expect("store should fail");
    assert!(matches!(err, StorageError::Io(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn migrations_create_alert_table() {
    let (_dir, store) = setup().await;
    assert_eq!(alert::Entity::find().count(store.db()).await.unwrap(), 0);
    assert_eq!(
        network_check::Entity::find().count(store.db()).await.unwrap(),
        0
    );
}
