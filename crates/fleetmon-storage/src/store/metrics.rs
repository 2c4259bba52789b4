use chrono::{DateTime, Utc};
use fleetmon_common::types::{
    DeliveryPayload, NetworkCheck, NetworkCheckRecord, SystemMetricRecord,
};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};

use crate::entities::network_check::{
    self, Column as CheckCol, Entity as CheckEntity,
};
use crate::entities::system_metric::{
    self, Column as MetricCol, Entity as MetricEntity,
};
use crate::error::{Result, StorageError};
use crate::store::agent::upsert_agent;
use crate::store::MetricStore;

/// What an ingestion did with a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// One system metric row plus `checks` network check rows were written.
    Stored { checks: usize },
    /// The `delivery_id` was already stored; only the agent row was refreshed.
    Duplicate,
}

// SQLite INTEGER and Postgres BIGINT are both signed.
fn to_db_bytes(field: &'static str, value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| StorageError::Other(format!("{field} out of range: {value}")))
}

fn from_db_bytes(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn metric_to_record(m: system_metric::Model) -> SystemMetricRecord {
    SystemMetricRecord {
        id: m.id,
        agent_id: m.agent_id,
        timestamp: m.timestamp.with_timezone(&Utc),
        cpu_percent: m.cpu_percent,
        memory_total: from_db_bytes(m.memory_total),
        memory_used: from_db_bytes(m.memory_used),
        memory_percent: m.memory_percent,
        disk_total: from_db_bytes(m.disk_total),
        disk_used: from_db_bytes(m.disk_used),
        disk_percent: m.disk_percent,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

fn check_to_record(m: network_check::Model) -> NetworkCheckRecord {
    NetworkCheckRecord {
        id: m.id,
        agent_id: m.agent_id,
        timestamp: m.timestamp.with_timezone(&Utc),
        target: m.target,
        check_type: m.check_type,
        status: m.status,
        latency_ms: m.latency_ms,
        error_message: m.error_message,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

fn check_to_active(
    agent_id: &str,
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    check: &NetworkCheck,
) -> network_check::ActiveModel {
    network_check::ActiveModel {
        id: Set(fleetmon_common::id::next_id()),
        agent_id: Set(agent_id.to_owned()),
        timestamp: Set(timestamp.fixed_offset()),
        target: Set(check.target()),
        check_type: Set(check.check_type().as_str().to_owned()),
        status: Set(check.status().to_owned()),
        latency_ms: Set(check.latency_ms()),
        error_message: Set(check.error().map(str::to_owned)),
        created_at: Set(now.fixed_offset()),
    }
}

impl MetricStore {
    /// Persist one delivery atomically.
    ///
    /// The agent upsert, the system metric row and every network check row
    /// are written in a single transaction. Any failure rolls all of them
    /// back and is returned to the caller.
    pub async fn ingest(&self, payload: &DeliveryPayload) -> Result<IngestOutcome> {
        let now = Utc::now();
        let txn = self.db().begin().await?;

        upsert_agent(&txn, &payload.agent_id, &payload.agent_name, now).await?;

        if let Some(delivery_id) = payload.delivery_id.as_deref() {
            let seen = MetricEntity::find()
                .filter(MetricCol::DeliveryId.eq(delivery_id))
                .count(&txn)
                .await?;
            if seen > 0 {
                txn.commit().await?;
                tracing::debug!(
                    agent_id = %payload.agent_id,
                    delivery_id,
                    "Duplicate delivery ignored"
                );
                return Ok(IngestOutcome::Duplicate);
            }
        }

        let sys = &payload.system;
        let metric = system_metric::ActiveModel {
            id: Set(fleetmon_common::id::next_id()),
            agent_id: Set(payload.agent_id.clone()),
            timestamp: Set(payload.timestamp.fixed_offset()),
            cpu_percent: Set(sys.cpu_percent),
            memory_total: Set(to_db_bytes("memory.total", sys.memory.total)?),
            memory_used: Set(to_db_bytes("memory.used", sys.memory.used)?),
            memory_percent: Set(sys.memory.percent),
            disk_total: Set(to_db_bytes("disk.total", sys.disk.total)?),
            disk_used: Set(to_db_bytes("disk.used", sys.disk.used)?),
            disk_percent: Set(sys.disk.percent),
            delivery_id: Set(payload.delivery_id.clone()),
            created_at: Set(now.fixed_offset()),
        };
        MetricEntity::insert(metric)
            .exec_without_returning(&txn)
            .await?;

        let checks = payload.network.len();
        if checks > 0 {
            let rows = payload
                .network
                .iter()
                .map(|c| check_to_active(&payload.agent_id, payload.timestamp, now, c));
            CheckEntity::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        tracing::debug!(
            agent_id = %payload.agent_id,
            checks,
            "Stored metrics"
        );
        Ok(IngestOutcome::Stored { checks })
    }

    /// The record with the greatest record timestamp for `agent_id`.
    pub async fn latest_system_metric(
        &self,
        agent_id: &str,
    ) -> Result<Option<SystemMetricRecord>> {
        let row = MetricEntity::find()
            .filter(MetricCol::AgentId.eq(agent_id))
            .order_by_desc(MetricCol::Timestamp)
            .order_by_desc(MetricCol::CreatedAt)
            .one(self.db())
            .await?;
        Ok(row.map(metric_to_record))
    }

    /// Records at or after `since`, oldest first.
    pub async fn system_metrics_since(
        &self,
        agent_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SystemMetricRecord>> {
        let rows = MetricEntity::find()
            .filter(MetricCol::AgentId.eq(agent_id))
            .filter(MetricCol::Timestamp.gte(since.fixed_offset()))
            .order_by_asc(MetricCol::Timestamp)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(metric_to_record).collect())
    }

    /// Latest `limit` network checks for `agent_id`, newest first.
    pub async fn recent_network_checks(
        &self,
        agent_id: &str,
        limit: u64,
    ) -> Result<Vec<NetworkCheckRecord>> {
        let rows = CheckEntity::find()
            .filter(CheckCol::AgentId.eq(agent_id))
            .order_by_desc(CheckCol::Timestamp)
            .order_by_desc(CheckCol::CreatedAt)
            .limit(limit)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(check_to_record).collect())
    }

    pub async fn count_system_metrics(&self, agent_id: &str) -> Result<u64> {
        Ok(MetricEntity::find()
            .filter(MetricCol::AgentId.eq(agent_id))
            .count(self.db())
            .await?)
    }

    pub async fn count_network_checks(&self, agent_id: &str) -> Result<u64> {
        Ok(CheckEntity::find()
            .filter(CheckCol::AgentId.eq(agent_id))
            .count(self.db())
            .await?)
    }
}
