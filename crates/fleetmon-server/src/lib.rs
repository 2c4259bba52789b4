//! fleetmon collector: HTTP ingestion and query API over the metric store.

pub mod api;
pub mod app;
pub mod config;
pub mod logging;
pub mod state;
