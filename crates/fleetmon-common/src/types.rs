use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Memory usage in bytes. `percent` is `(total - available) / total * 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub percent: f64,
}

/// Usage of the root volume in bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

/// Host resource usage at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub cpu_percent: f64,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
}

/// Outcome of a TCP connect check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Up,
    Down,
}

impl HostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HostStatus::Up => "up",
            HostStatus::Down => "down",
        }
    }
}

/// Outcome of an HTTP GET check. Any answer other than 200 is `Degraded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlStatus {
    Up,
    Degraded,
    Down,
}

impl UrlStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UrlStatus::Up => "up",
            UrlStatus::Degraded => "degraded",
            UrlStatus::Down => "down",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostCheck {
    pub host: String,
    pub port: u16,
    pub status: HostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlCheck {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub status: UrlStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Kind of reachability check, stored as `check_type` on the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    Host,
    Url,
}

impl CheckType {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckType::Host => "host",
            CheckType::Url => "url",
        }
    }
}

impl std::fmt::Display for CheckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of [`DeliveryPayload::network`].
///
/// Entries are untagged on the wire: the variant is recognised by whether the
/// object carries `host` or `url`. An object with both (or neither) matches
/// no variant and fails to deserialize.
///
/// # Examples
///
/// ```
/// use fleetmon_common::types::{CheckType, NetworkCheck};
///
/// let check: NetworkCheck =
///     serde_json::from_str(r#"{"host":"8.8.8.8","port":53,"status":"up","latency_ms":12.3}"#)
///         .unwrap();
/// assert_eq!(check.check_type(), CheckType::Host);
/// assert_eq!(check.target(), "8.8.8.8:53");
///
/// let both = r#"{"host":"a","port":1,"url":"http://a","status":"up"}"#;
/// assert!(serde_json::from_str::<NetworkCheck>(both).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworkCheck {
    Host(HostCheck),
    Url(UrlCheck),
}

impl NetworkCheck {
    pub fn check_type(&self) -> CheckType {
        match self {
            NetworkCheck::Host(_) => CheckType::Host,
            NetworkCheck::Url(_) => CheckType::Url,
        }
    }

    /// `host:port` for host checks, the URL for URL checks.
    pub fn target(&self) -> String {
        match self {
            NetworkCheck::Host(c) => format!("{}:{}", c.host, c.port),
            NetworkCheck::Url(c) => c.url.clone(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            NetworkCheck::Host(c) => c.status.as_str(),
            NetworkCheck::Url(c) => c.status.as_str(),
        }
    }

    pub fn latency_ms(&self) -> Option<f64> {
        match self {
            NetworkCheck::Host(c) => c.latency_ms,
            NetworkCheck::Url(c) => c.latency_ms,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            NetworkCheck::Host(c) => c.error.as_deref(),
            NetworkCheck::Url(c) => c.error.as_deref(),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status() == "up"
    }
}

fn default_host_port() -> u16 {
    80
}

/// A configured check target.
///
/// Parsed from `{ type = "host", target = "8.8.8.8", port = 53 }` or
/// `{ type = "url", target = "https://example.com" }`. `port` defaults to 80.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NetworkTarget {
    Host {
        target: String,
        #[serde(default = "default_host_port")]
        port: u16,
    },
    Url {
        target: String,
    },
}

impl std::fmt::Display for NetworkTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkTarget::Host { target, port } => write!(f, "{target}:{port}"),
            NetworkTarget::Url { target } => f.write_str(target),
        }
    }
}

/// One collection cycle's reading, pushed by an agent to the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    pub agent_id: String,
    pub agent_name: String,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    /// Stamped once per assembled payload and reused across retries, so the
    /// collector can drop a delivery it has already stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
    pub system: SystemSnapshot,
    #[serde(default)]
    pub network: Vec<NetworkCheck>,
}

/// Parse an ISO-8601 timestamp as sent by agents.
///
/// Accepts RFC 3339 with `Z` or an explicit offset, and naive date-times
/// (with `T` or a space separator), which are taken to be UTC.
///
/// # Examples
///
/// ```
/// use fleetmon_common::types::parse_timestamp;
///
/// let z = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
/// let offset = parse_timestamp("2024-01-01T02:00:00+02:00").unwrap();
/// let naive = parse_timestamp("2024-01-01T00:00:00").unwrap();
/// assert_eq!(z, offset);
/// assert_eq!(z, naive);
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Format a timestamp the way agents put it on the wire.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

/// Liveness of an agent row. Ingestion only ever sets `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AgentStatus::Active),
            "inactive" => Ok(AgentStatus::Inactive),
            _ => Err(format!("unknown agent status: {s}")),
        }
    }
}

/// Agent row as listed by the collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub agent_name: String,
    pub status: AgentStatus,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Persisted system reading. `timestamp` is the agent's assembly time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetricRecord {
    pub id: String,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_total: u64,
    pub memory_used: u64,
    pub memory_percent: f64,
    pub disk_total: u64,
    pub disk_used: u64,
    pub disk_percent: f64,
    pub created_at: DateTime<Utc>,
}

/// Persisted check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkCheckRecord {
    pub id: String,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub check_type: String,
    pub status: String,
    pub latency_ms: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}
