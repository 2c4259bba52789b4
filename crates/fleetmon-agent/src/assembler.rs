use crate::config::AgentConfig;
use chrono::Utc;
use fleetmon_collector::network::ReachabilityChecker;
use fleetmon_collector::system::SysinfoSampler;
use fleetmon_collector::{ResourceSampler, Result};
use fleetmon_common::types::{DeliveryPayload, NetworkTarget};

/// Builds one [`DeliveryPayload`] per cycle from the configured sampler and
/// check targets.
pub struct MetricsAssembler {
    agent_id: String,
    agent_name: String,
    sampler: Box<dyn ResourceSampler>,
    checker: ReachabilityChecker,
    targets: Vec<NetworkTarget>,
}

impl MetricsAssembler {
    pub fn new(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        sampler: Box<dyn ResourceSampler>,
        checker: ReachabilityChecker,
        targets: Vec<NetworkTarget>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            sampler,
            checker,
            targets,
        }
    }

    /// Assembler backed by the real host sampler.
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.agent_id.clone(),
            config.agent_name.clone(),
            Box::new(SysinfoSampler::new()),
            ReachabilityChecker::new(config.host_check_timeout(), config.url_check_timeout()),
            config.network_targets.clone(),
        )
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Sample resources, then check every target.
    ///
    /// A sampler failure fails the whole cycle; failed checks are part of
    /// the payload.
    pub async fn assemble(&mut self) -> Result<DeliveryPayload> {
        let system = match self.sampler.sample().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(agent_id = %self.agent_id, error = %e, "Resource sampling failed");
                return Err(e);
            }
        };
        let network = self.checker.collect_all(&self.targets).await;

        tracing::info!(
            cpu = system.cpu_percent,
            memory = system.memory.percent,
            disk = system.disk.percent,
            checks = network.len(),
            "Collected metrics"
        );

        Ok(DeliveryPayload {
            agent_id: self.agent_id.clone(),
            agent_name: self.agent_name.clone(),
            timestamp: Utc::now(),
            delivery_id: Some(fleetmon_common::id::next_id()),
            system,
            network,
        })
    }
}
