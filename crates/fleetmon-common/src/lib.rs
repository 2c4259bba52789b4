//! Types shared by the fleetmon agent and collector.
//!
//! [`types::DeliveryPayload`] is the single wire message: the agent builds
//! one per collection cycle and the collector's ingestion endpoint accepts it.

pub mod id;
pub mod types;
