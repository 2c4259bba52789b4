use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "system_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub agent_id: String,
    pub timestamp: DateTimeWithTimeZone,
    pub cpu_percent: f64,
    pub memory_total: i64,
    pub memory_used: i64,
    pub memory_percent: f64,
    pub disk_total: i64,
    pub disk_used: i64,
    pub disk_percent: f64,
    #[sea_orm(unique)]
    pub delivery_id: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
