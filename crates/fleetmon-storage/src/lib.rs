//! Persistence for the fleetmon collector.
//!
//! [`MetricStore`] owns the database (SQLite by default, PostgreSQL when a
//! `postgres://` URL is configured) and exposes the ingestion transaction
//! plus the read queries behind the collector's HTTP API. The schema is
//! managed by the `migration` crate and applied on connect.

pub mod entities;
pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

pub use error::{Result, StorageError};
pub use store::{IngestOutcome, MetricStore};
