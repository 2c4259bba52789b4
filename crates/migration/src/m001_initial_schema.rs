use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = match manager.get_database_backend() {
            DatabaseBackend::Postgres => UP_SQL_POSTGRES,
            DatabaseBackend::Sqlite => UP_SQL_SQLITE,
            other => {
                return Err(DbErr::Migration(format!(
                    "unsupported database backend: {other:?}"
                )))
            }
        };
        manager.get_connection().execute_unprepared(sql).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

// Timestamps are RFC 3339 text in SQLite; every value is written in UTC so
// lexical order matches chronological order.
const UP_SQL_SQLITE: &str = "
CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY NOT NULL,
    agent_id TEXT NOT NULL UNIQUE,
    agent_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    last_seen TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_agents_last_seen ON agents(last_seen DESC);

CREATE TABLE IF NOT EXISTS system_metrics (
    id TEXT PRIMARY KEY NOT NULL,
    agent_id TEXT NOT NULL REFERENCES agents(agent_id),
    timestamp TEXT NOT NULL,
    cpu_percent REAL NOT NULL,
    memory_total INTEGER NOT NULL,
    memory_used INTEGER NOT NULL,
    memory_percent REAL NOT NULL,
    disk_total INTEGER NOT NULL,
    disk_used INTEGER NOT NULL,
    disk_percent REAL NOT NULL,
    delivery_id TEXT UNIQUE,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_system_metrics_agent_ts ON system_metrics(agent_id, timestamp DESC);

CREATE TABLE IF NOT EXISTS network_checks (
    id TEXT PRIMARY KEY NOT NULL,
    agent_id TEXT NOT NULL REFERENCES agents(agent_id),
    timestamp TEXT NOT NULL,
    target TEXT NOT NULL,
    check_type TEXT NOT NULL,
    status TEXT NOT NULL,
    latency_ms REAL,
    error_message TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_network_checks_agent_ts ON network_checks(agent_id, timestamp DESC);

CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY NOT NULL,
    agent_id TEXT NOT NULL REFERENCES agents(agent_id),
    alert_type TEXT,
    severity TEXT,
    message TEXT,
    threshold_value REAL,
    actual_value REAL,
    status TEXT NOT NULL DEFAULT 'active',
    triggered_at TEXT NOT NULL,
    resolved_at TEXT,
    notified INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alerts_agent_id ON alerts(agent_id);
";

const UP_SQL_POSTGRES: &str = "
CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY NOT NULL,
    agent_id TEXT NOT NULL UNIQUE,
    agent_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    last_seen TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_agents_last_seen ON agents(last_seen DESC);

CREATE TABLE IF NOT EXISTS system_metrics (
    id TEXT PRIMARY KEY NOT NULL,
    agent_id TEXT NOT NULL REFERENCES agents(agent_id),
    timestamp TIMESTAMPTZ NOT NULL,
    cpu_percent DOUBLE PRECISION NOT NULL,
    memory_total BIGINT NOT NULL,
    memory_used BIGINT NOT NULL,
    memory_percent DOUBLE PRECISION NOT NULL,
    disk_total BIGINT NOT NULL,
    disk_used BIGINT NOT NULL,
    disk_percent DOUBLE PRECISION NOT NULL,
    delivery_id TEXT UNIQUE,
    created_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_system_metrics_agent_ts ON system_metrics(agent_id, timestamp DESC);

CREATE TABLE IF NOT EXISTS network_checks (
    id TEXT PRIMARY KEY NOT NULL,
    agent_id TEXT NOT NULL REFERENCES agents(agent_id),
    timestamp TIMESTAMPTZ NOT NULL,
    target TEXT NOT NULL,
    check_type TEXT NOT NULL,
    status TEXT NOT NULL,
    latency_ms DOUBLE PRECISION,
    error_message TEXT,
    created_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_network_checks_agent_ts ON network_checks(agent_id, timestamp DESC);

CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY NOT NULL,
    agent_id TEXT NOT NULL REFERENCES agents(agent_id),
    alert_type TEXT,
    severity TEXT,
    message TEXT,
    threshold_value DOUBLE PRECISION,
    actual_value DOUBLE PRECISION,
    status TEXT NOT NULL DEFAULT 'active',
    triggered_at TIMESTAMPTZ NOT NULL,
    resolved_at TIMESTAMPTZ,
    notified BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alerts_agent_id ON alerts(agent_id);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS alerts;
DROP TABLE IF EXISTS network_checks;
DROP TABLE IF EXISTS system_metrics;
DROP TABLE IF EXISTS agents;
";
