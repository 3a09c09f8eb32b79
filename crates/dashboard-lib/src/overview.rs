//! Host list with per-host trigger, alert and problem counts

use crate::error::{DashboardError, Result};
use crate::models::HostSummary;
use crate::upstream::MonitoringApi;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Message shown when the overview cannot be assembled
pub const OVERVIEW_FAILURE: &str = "Failed to load hosts or counts";

/// List every host with its counts.
///
/// Counts for all hosts are fetched concurrently. Any failed query fails the
/// whole overview; partial results are never returned.
pub async fn host_overview(api: Arc<dyn MonitoringApi>) -> Result<Vec<HostSummary>> {
    let hosts = api
        .list_hosts(json!({ "output": ["hostid", "host", "name"] }))
        .await
        .map_err(|e| {
            warn!(error = %e, "{}", OVERVIEW_FAILURE);
            e
        })?;

    let mut tasks = JoinSet::new();
    for (index, host) in hosts.iter().enumerate() {
        let api = api.clone();
        let host_id = host.hostid.clone();
        tasks.spawn(async move {
            let counts = tokio::try_join!(
                api.active_triggers(&host_id),
                api.alerts(&host_id),
                api.problems(&host_id),
            );
            (index, counts)
        });
    }

    let mut counts = vec![(0, 0, 0); hosts.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, outcome) = joined.map_err(|e| {
            DashboardError::Transport(format!("overview task failed: {}", e))
        })?;
        match outcome {
            Ok((triggers, alerts, problems)) => {
                counts[index] = (triggers.len(), alerts.len(), problems.len());
            }
            Err(e) => {
                warn!(host_id = %hosts[index].hostid, error = %e, "{}", OVERVIEW_FAILURE);
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    debug!(hosts = hosts.len(), "Host overview assembled");
    Ok(hosts
        .into_iter()
        .zip(counts)
        .map(|(host, (trigger_count, alert_count, problem_count))| HostSummary {
            host,
            trigger_count,
            alert_count,
            problem_count,
        })
        .collect())
}
