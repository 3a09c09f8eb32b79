//! Access to the monitoring API
//!
//! `MonitoringApi` is the request/response contract the rest of the dashboard
//! is written against. `ZabbixClient` implements it over Zabbix JSON-RPC;
//! the terminal client implements it over the proxy's HTTP endpoints.

mod zabbix;


pub use zabbix::{ZabbixClient, ZabbixClientBuilder, ZabbixConfig};

use crate::commands::TriggerDraft;
use crate::error::Result;
use crate::models::{
    Alert, HistoryPoint, Host, Item, MetricKind, Problem, Trigger, TriggerIds, TriggerStatus,
};
use serde_json::Value;

pub use async_trait::async_trait;

/// Operations offered by the monitoring API.
///
/// "No data" is never an error: empty sequences are valid results. Errors are
/// reserved for validation, authentication and transport failures.
#[async_trait]
pub trait MonitoringApi: Send + Sync {
    /// List hosts; `filter` is passed through as `host.get` params
    async fn list_hosts(&self, filter: Value) -> Result<Vec<Host>>;

    /// CPU load items of a host
    async fn cpu_load_items(&self, host_id: &str) -> Result<Vec<Item>>;

    /// Uptime items of a host
    async fn uptime_items(&self, host_id: &str) -> Result<Vec<Item>>;

    /// Enabled triggers currently in the problem state, with dependencies
    async fn active_triggers(&self, host_id: &str) -> Result<Vec<Trigger>>;

    /// Triggers currently in the problem state
    async fn alerts(&self, host_id: &str) -> Result<Vec<Alert>>;

    /// Recent unresolved problems
    async fn problems(&self, host_id: &str) -> Result<Vec<Problem>>;

    /// Most recent history points for a metric, newest first.
    ///
    /// Empty when the host has no item for the metric.
    async fn latest_samples(&self, host_id: &str, kind: MetricKind) -> Result<Vec<HistoryPoint>>;

    /// Create a trigger
    async fn create_trigger(&self, draft: &TriggerDraft) -> Result<TriggerIds>;

    /// Enable or disable a trigger
    async fn update_trigger_status(
        &self,
        trigger_id: &str,
        status: TriggerStatus,
    ) -> Result<TriggerIds>;
}
