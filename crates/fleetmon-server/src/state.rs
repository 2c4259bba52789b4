use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use fleetmon_storage::MetricStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MetricStore>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: MetricStore, config: ServerConfig) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
            start_time: Utc::now(),
        }
    }
}
