use crate::config::AgentConfig;
use fleetmon_common::types::DeliveryPayload;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;

/// Per-attempt request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery: no payload to send")]
    EmptyPayload,

    /// The collector could not be reached on any attempt.
    #[error("Delivery: connection failed after {attempts} attempt(s): {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The collector answered with something other than 200.
    #[error("Delivery: collector responded with HTTP {status}")]
    Protocol { status: u16 },

    #[error("Delivery: request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Delivery: failed to encode payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// POSTs payloads to the collector's ingestion endpoint.
///
/// Only connection-establishment failures are retried, with a fixed delay
/// between attempts. Protocol errors and other request errors end the
/// delivery on the spot.
pub struct DeliveryClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl DeliveryClient {
    pub fn new(
        endpoint: impl Into<String>,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            max_retries: max_retries.max(1),
            retry_delay,
        })
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self, DeliveryError> {
        Self::new(
            config.metrics_endpoint(),
            config.max_retries,
            config.retry_delay(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `true` iff the collector acknowledged the payload with HTTP 200.
    pub async fn send(&self, payload: Option<&DeliveryPayload>) -> bool {
        match self.try_send(payload).await {
            Ok(()) => true,
            Err(DeliveryError::EmptyPayload) => {
                tracing::warn!("No metrics to send");
                false
            }
            Err(e) => {
                tracing::error!(endpoint = %self.endpoint, error = %e, "Failed to deliver metrics");
                false
            }
        }
    }

    pub async fn try_send(&self, payload: Option<&DeliveryPayload>) -> Result<(), DeliveryError> {
        let payload = payload.ok_or(DeliveryError::EmptyPayload)?;
        let body = serde_json::to_vec(payload)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
                .send()
                .await;

            match result {
                Ok(resp) if resp.status() == StatusCode::OK => {
                    tracing::info!(
                        agent_id = %payload.agent_id,
                        attempt,
                        "Metrics delivered"
                    );
                    return Ok(());
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let text = resp.text().await.unwrap_or_default();
                    tracing::warn!(
                        status,
                        body = %truncate(&text, 200),
                        "Collector rejected metrics"
                    );
                    return Err(DeliveryError::Protocol { status });
                }
                Err(e) if e.is_connect() => {
                    if attempt >= self.max_retries {
                        return Err(DeliveryError::Connection {
                            attempts: attempt,
                            source: e,
                        });
                    }
                    tracing::warn!(
                        attempt,
                        max_retries = self.max_retries,
                        retry_in_secs = self.retry_delay.as_secs_f64(),
                        error = %e,
                        "Collector unreachable, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(DeliveryError::Request(e)),
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_retries_still_makes_one_attempt() {
        let client = DeliveryClient::new("http://localhost:1/api/v1/metrics", 0, Duration::ZERO)
            .unwrap();
        assert_eq!(client.max_retries, 1);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 200), "short");
    }

    #[tokio::test]
    async fn missing_payload_is_not_sent() {
        let client = DeliveryClient::new("http://localhost:1/api/v1/metrics", 3, Duration::ZERO)
            .unwrap();
        assert!(!client.send(None).await);
        assert!(matches!(
            client.try_send(None).await,
            Err(DeliveryError::EmptyPayload)
        ));
    }
}
