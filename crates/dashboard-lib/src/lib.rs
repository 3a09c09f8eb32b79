//! Core library for the Zabbix dashboard
//!
//! This crate provides the core functionality for:
//! - Talking to the Zabbix JSON-RPC API
//! - Aggregating CPU, memory and disk readings into a rolling history
//! - Interval polling with cancellation
//! - Host-detail view state, host overview and trigger commands
//! - Observability

pub mod commands;
pub mod error;
pub mod history;
pub mod models;
pub mod observability;
pub mod overview;
pub mod poller;
pub mod session;
pub mod upstream;

#[cfg(test)]
mod testing;

pub use commands::TriggerDraft;
pub use error::{DashboardError, Result};
pub use history::{Chart, ChartSeries, HistoryBuffer, HistoryConfig, HistoryRecord};
pub use models::*;
pub use observability::{DashboardMetrics, StructuredLogger};
pub use overview::host_overview;
pub use poller::{PollerConfig, PollerHandle, TickReport};
pub use session::{HostSession, HostView};
pub use upstream::{MonitoringApi, ZabbixClient, ZabbixConfig};
