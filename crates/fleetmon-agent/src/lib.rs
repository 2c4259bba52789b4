//! fleetmon agent: samples host resources and reachability on a fixed
//! interval and delivers each snapshot to the collector over HTTP.

pub mod assembler;
pub mod config;
pub mod delivery;
pub mod scheduler;

pub use assembler::MetricsAssembler;
pub use config::AgentConfig;
pub use delivery::{DeliveryClient, DeliveryError};
pub use scheduler::Scheduler;
