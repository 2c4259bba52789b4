use crate::round_to;
use fleetmon_common::types::{
    HostCheck, HostStatus, NetworkCheck, NetworkTarget, UrlCheck, UrlStatus,
};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

pub const DEFAULT_HOST_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_URL_TIMEOUT: Duration = Duration::from_secs(5);

fn elapsed_ms(start: Instant) -> f64 {
    round_to(start.elapsed().as_secs_f64() * 1000.0, 2)
}

/// Status, latency on success, error text otherwise.
type ConnectOutcome = (HostStatus, Option<f64>, Option<String>);

/// Awaits `connect` for at most `timeout`.
async fn timed_connect<T, F>(connect: F, timeout: Duration) -> ConnectOutcome
where
    F: Future<Output = std::io::Result<T>>,
{
    let start = Instant::now();
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(_conn)) => (HostStatus::Up, Some(elapsed_ms(start)), None),
        Ok(Err(e)) => (HostStatus::Down, None, Some(e.to_string())),
        Err(_) => (
            HostStatus::Down,
            None,
            Some(format!("timed out after {:.1}s", timeout.as_secs_f64())),
        ),
    }
}

/// Opens a TCP connection to `host:port`.
///
/// Never fails: timeouts, refusals and resolution errors produce a `Down`
/// result carrying the error text.
pub async fn check_host(host: &str, port: u16, timeout: Duration) -> HostCheck {
    let (status, latency_ms, error) =
        timed_connect(TcpStream::connect((host, port)), timeout).await;

    if let Some(ref e) = error {
        tracing::debug!(host, port, error = %e, "Host check failed");
    }

    HostCheck {
        host: host.to_string(),
        port,
        status,
        latency_ms,
        error,
    }
}

/// Issues an HTTP GET against `url`. `Up` iff the answer is 200.
///
/// Never fails: request-level errors produce a `Down` result.
pub async fn check_url(client: &reqwest::Client, url: &str, timeout: Duration) -> UrlCheck {
    let start = Instant::now();
    match client.get(url).timeout(timeout).send().await {
        Ok(resp) => {
            let code = resp.status().as_u16();
            UrlCheck {
                url: url.to_string(),
                status_code: Some(code),
                status: if code == 200 {
                    UrlStatus::Up
                } else {
                    UrlStatus::Degraded
                },
                latency_ms: Some(elapsed_ms(start)),
                error: None,
            }
        }
        Err(e) => {
            tracing::debug!(url, error = %e, "URL check failed");
            UrlCheck {
                url: url.to_string(),
                status_code: None,
                status: UrlStatus::Down,
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Checks configured targets one after another.
pub struct ReachabilityChecker {
    client: reqwest::Client,
    host_timeout: Duration,
    url_timeout: Duration,
}

impl ReachabilityChecker {
    pub fn new(host_timeout: Duration, url_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            host_timeout,
            url_timeout,
        }
    }

    pub async fn check(&self, target: &NetworkTarget) -> NetworkCheck {
        match target {
            NetworkTarget::Host { target, port } => {
                NetworkCheck::Host(check_host(target, *port, self.host_timeout).await)
            }
            NetworkTarget::Url { target } => {
                NetworkCheck::Url(check_url(&self.client, target, self.url_timeout).await)
            }
        }
    }

    /// One result per target, in input order.
    pub async fn collect_all(&self, targets: &[NetworkTarget]) -> Vec<NetworkCheck> {
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            results.push(self.check(target).await);
        }
        let up = results.iter().filter(|r| r.is_up()).count();
        tracing::debug!(total = results.len(), up, "Network checks completed");
        results
    }
}

impl Default for ReachabilityChecker {
    fn default() -> Self {
        Self::new(DEFAULT_HOST_TIMEOUT, DEFAULT_URL_TIMEOUT)
    }
}
