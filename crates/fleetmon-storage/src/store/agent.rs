use chrono::{DateTime, Utc};
use fleetmon_common::types::{AgentStatus, AgentSummary};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

use crate::entities::agent::{self, Column as AgentCol, Entity as AgentEntity};
use crate::error::Result;
use crate::store::MetricStore;

fn agent_to_summary(m: agent::Model) -> AgentSummary {
    AgentSummary {
        status: m.status.parse().unwrap_or(AgentStatus::Inactive),
        agent_id: m.agent_id,
        agent_name: m.agent_name,
        last_seen: m.last_seen.map(|t| t.with_timezone(&Utc)),
    }
}

/// Insert the agent, or refresh `status`, `last_seen` and `updated_at` when
/// `agent_id` already exists. `agent_name` is only written on insert.
pub(crate) async fn upsert_agent<C: ConnectionTrait>(
    conn: &C,
    agent_id: &str,
    agent_name: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let now = now.fixed_offset();
    let am = agent::ActiveModel {
        id: Set(fleetmon_common::id::next_id()),
        agent_id: Set(agent_id.to_owned()),
        agent_name: Set(agent_name.to_owned()),
        status: Set(AgentStatus::Active.as_str().to_owned()),
        last_seen: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    AgentEntity::insert(am)
        .on_conflict(
            OnConflict::column(AgentCol::AgentId)
                .update_columns([AgentCol::Status, AgentCol::LastSeen, AgentCol::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

impl MetricStore {
    /// All known agents, most recently seen first.
    pub async fn list_agents(&self) -> Result<Vec<AgentSummary>> {
        let rows = AgentEntity::find()
            .order_by_desc(AgentCol::LastSeen)
            .order_by_asc(AgentCol::AgentId)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(agent_to_summary).collect())
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<Option<AgentSummary>> {
        let row = AgentEntity::find()
            .filter(AgentCol::AgentId.eq(agent_id))
            .one(self.db())
            .await?;
        Ok(row.map(agent_to_summary))
    }

    pub async fn count_agents(&self) -> Result<u64> {
        Ok(AgentEntity::find().count(self.db()).await?)
    }
}
