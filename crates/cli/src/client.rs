//! API client for communicating with the Zabbix proxy

use anyhow::{Context, Result};
use async_trait::async_trait;
use dashboard_lib::{
    commands::{validate_host_id, validate_trigger_id},
    Alert, DashboardError, HistoryPoint, Host, Item, MetricKind, MonitoringApi, Problem, Trigger,
    TriggerDraft, TriggerIds, TriggerStatus,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

/// Client for the proxy's `/api/zabbix/*` endpoints
pub struct ProxyClient {
    client: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Route serving the latest history points of a metric
fn latest_route(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Cpu => "api/zabbix/cpu-load-latest",
        MetricKind::Memory => "api/zabbix/memory-utilization-latest",
        MetricKind::Disk => "api/zabbix/disk-utilization-latest",
    }
}

impl ProxyClient {
    /// Create a new proxy client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = Url::parse(base_url).context("Invalid proxy URL")?;
        // Joined paths must extend the base, not replace its last segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a POST request with JSON body
    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> dashboard_lib::Result<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| DashboardError::Validation(format!("invalid path {}: {}", path, e)))?;
        debug!(url = %url, "POST");

        let response = self.client.post(url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            if status == reqwest::StatusCode::BAD_REQUEST {
                return Err(DashboardError::Validation(message));
            }
            return Err(DashboardError::Proxy {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    async fn for_host<T: DeserializeOwned>(&self, path: &str, host_id: &str) -> dashboard_lib::Result<T> {
        validate_host_id(host_id)?;
        self.post(path, &json!({ "hostid": host_id })).await
    }
}

#[async_trait]
impl MonitoringApi for ProxyClient {
    async fn list_hosts(&self, filter: Value) -> dashboard_lib::Result<Vec<Host>> {
        let body = match filter {
            Value::Null => json!({}),
            other => other,
        };
        self.post("api/zabbix/hosts", &body).await
    }

    async fn cpu_load_items(&self, host_id: &str) -> dashboard_lib::Result<Vec<Item>> {
        self.for_host("api/zabbix/cpu-load", host_id).await
    }

    async fn uptime_items(&self, host_id: &str) -> dashboard_lib::Result<Vec<Item>> {
        self.for_host("api/zabbix/uptime", host_id).await
    }

    async fn active_triggers(&self, host_id: &str) -> dashboard_lib::Result<Vec<Trigger>> {
        self.for_host("api/zabbix/active-triggers", host_id).await
    }

    async fn alerts(&self, host_id: &str) -> dashboard_lib::Result<Vec<Alert>> {
        self.for_host("api/zabbix/alerts", host_id).await
    }

    async fn problems(&self, host_id: &str) -> dashboard_lib::Result<Vec<Problem>> {
        self.for_host("api/zabbix/problems", host_id).await
    }

    async fn latest_samples(
        &self,
        host_id: &str,
        kind: MetricKind,
    ) -> dashboard_lib::Result<Vec<HistoryPoint>> {
        self.for_host(latest_route(kind), host_id).await
    }

    async fn create_trigger(&self, draft: &TriggerDraft) -> dashboard_lib::Result<TriggerIds> {
        draft.validate()?;
        self.post(
            "api/zabbix/trigger/create",
            &json!({
                "hostid": draft.host_id,
                "description": draft.description,
                "expression": draft.expression,
                "priority": draft.priority,
            }),
        )
        .await
    }

    async fn update_trigger_status(
        &self,
        trigger_id: &str,
        status: TriggerStatus,
    ) -> dashboard_lib::Result<TriggerIds> {
        validate_trigger_id(trigger_id)?;
        self.post(
            "api/zabbix/trigger/update",
            &json!({ "triggerid": trigger_id, "status": status.code() }),
        )
        .await
    }
}
