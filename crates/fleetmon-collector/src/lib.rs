//! Host-side collection for the fleetmon agent.
//!
//! [`system`] samples CPU, memory and root-disk usage through a
//! [`ResourceSampler`]; [`network`] checks reachability of configured
//! targets. Reachability checks never fail: unreachable targets are reported as results.

pub mod network;
pub mod system;

use async_trait::async_trait;
use fleetmon_common::types::SystemSnapshot;

/// Errors raised while reading local resource counters.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    /// The OS reported no CPUs, so no utilization can be computed.
    #[error("Collector: no CPU readings available")]
    NoCpu,

    /// Total memory was reported as zero.
    #[error("Collector: memory totals unavailable")]
    NoMemory,

    /// No disk could be matched to the root volume.
    #[error("Collector: no disk found for volume '{0}'")]
    NoDisk(String),
}

/// Convenience `Result` alias for collection operations.
pub type Result<T> = std::result::Result<T, CollectionError>;

/// Reads resource utilization at the instant of invocation.
///
/// Called once per agent cycle. Implementations may block for a sampling
/// window (CPU utilization needs two readings some time apart).
#[async_trait]
pub trait ResourceSampler: Send {
    /// Returns a complete snapshot, or an error when any reading is
    /// unavailable. Partial snapshots are never returned.
    async fn sample(&mut self) -> Result<SystemSnapshot>;
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
