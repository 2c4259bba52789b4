use fleetmon_common::types::NetworkTarget;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const METRICS_PATH: &str = "/api/v1/metrics";

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_host_name")]
    pub agent_id: String,
    #[serde(default = "default_host_name")]
    pub agent_name: String,
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,
    /// Checked in order every cycle. An empty list falls back to the defaults.
    #[serde(default = "default_network_targets")]
    pub network_targets: Vec<NetworkTarget>,
    /// Total delivery attempts on connection failure (at least 1).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_host_check_timeout")]
    pub host_check_timeout_secs: u64,
    #[serde(default = "default_url_check_timeout")]
    pub url_check_timeout_secs: u64,
}

fn default_host_name() -> String {
    sysinfo::System::host_name()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "unknown-host".to_string())
}

fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_collection_interval() -> u64 {
    60
}

fn default_network_targets() -> Vec<NetworkTarget> {
    vec![
        NetworkTarget::Host {
            target: "8.8.8.8".to_string(),
            port: 53,
        },
        NetworkTarget::Url {
            target: "https://www.google.com".to_string(),
        },
    ]
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

fn default_host_check_timeout() -> u64 {
    3
}

fn default_url_check_timeout() -> u64 {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_id: default_host_name(),
            agent_name: default_host_name(),
            server_url: default_server_url(),
            collection_interval_secs: default_collection_interval(),
            network_targets: default_network_targets(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            host_check_timeout_secs: default_host_check_timeout(),
            url_check_timeout_secs: default_url_check_timeout(),
        }
    }
}

impl AgentConfig {
    /// Read `path` if it exists, otherwise start from defaults. Environment
    /// overrides are applied afterwards.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)?
        } else {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config.normalized())
    }

    /// Apply `FLEETMON_AGENT_ID`, `FLEETMON_AGENT_NAME` and
    /// `FLEETMON_SERVER_URL` as resolved by `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty("FLEETMON_AGENT_ID") {
            self.agent_id = v;
        }
        if let Some(v) = non_empty("FLEETMON_AGENT_NAME") {
            self.agent_name = v;
        }
        if let Some(v) = non_empty("FLEETMON_SERVER_URL") {
            self.server_url = v;
        }
        self.normalized()
    }

    fn normalized(mut self) -> Self {
        if self.network_targets.is_empty() {
            self.network_targets = default_network_targets();
        }
        self.max_retries = self.max_retries.max(1);
        self
    }

    /// Full ingestion URL derived from `server_url`.
    pub fn metrics_endpoint(&self) -> String {
        format!("{}{METRICS_PATH}", self.server_url.trim().trim_end_matches('/'))
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn host_check_timeout(&self) -> Duration {
        Duration::from_secs(self.host_check_timeout_secs)
    }

    pub fn url_check_timeout(&self) -> Duration {
        Duration::from_secs(self.url_check_timeout_secs)
    }
}
