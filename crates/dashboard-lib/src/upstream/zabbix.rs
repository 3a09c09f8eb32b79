//! Zabbix JSON-RPC client
//!
//! This module provides the client the proxy uses to reach Zabbix:
//! - `user.login` with the configured credentials, token cached between calls
//! - Bearer authentication on every other call
//! - JSON-RPC error objects mapped onto `DashboardError::Upstream`
//! - per-method latency and error metrics

use super::MonitoringApi;
use crate::commands::{validate_host_id, validate_trigger_id, TriggerDraft};
use crate::error::{DashboardError, Result};
use crate::models::{
    Alert, HistoryPoint, Host, Item, MetricKind, Problem, Trigger, TriggerIds, TriggerStatus,
};
use crate::observability::DashboardMetrics;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Configuration for the Zabbix client
#[derive(Debug, Clone)]
pub struct ZabbixConfig {
    /// JSON-RPC endpoint (e.g., "http://zabbix.local/api_jsonrpc.php")
    pub endpoint: String,
    pub username: String,
    pub password: String,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
}

impl Default for ZabbixConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost/api_jsonrpc.php".to_string(),
            username: "Admin".to_string(),
            password: String::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

/// Client for the Zabbix JSON-RPC API
pub struct ZabbixClient {
    config: ZabbixConfig,
    http: Client,
    token: Arc<RwLock<Option<String>>>,
    metrics: DashboardMetrics,
}

impl ZabbixClient {
    /// Create a new client with the given configuration
    pub fn new(config: ZabbixConfig) -> Result<Self> {
        url::Url::parse(&config.endpoint).map_err(|e| {
            DashboardError::Validation(format!("invalid Zabbix endpoint {}: {}", config.endpoint, e))
        })?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DashboardError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http,
            token: Arc::new(RwLock::new(None)),
            metrics: DashboardMetrics::new(),
        })
    }

    pub fn builder() -> ZabbixClientBuilder {
        ZabbixClientBuilder::new()
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Whether a session token is currently cached
    pub async fn has_session(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Call an RPC method with the cached session, logging in first if needed
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let token = self.session_token().await?;

        let result = match self.send(method, params, Some(&token)).await {
            Ok(value) => value,
            Err(e) => {
                if e.is_session_expired() {
                    warn!(method = %method, "Zabbix session rejected, dropping cached token");
                    self.token.write().await.take();
                }
                return Err(e);
            }
        };

        serde_json::from_value(result).map_err(|e| {
            self.metrics.inc_upstream_errors("decode");
            DashboardError::Decode(format!("{}: {}", method, e))
        })
    }

    async fn session_token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut slot = self.token.write().await;
        // Another caller may have logged in while we waited for the lock
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let token = self.login().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    async fn login(&self) -> Result<String> {
        let params = json!({
            "username": self.config.username,
            "password": self.config.password,
        });

        let result = self
            .send("user.login", params, None)
            .await
            .map_err(|e| DashboardError::Auth(e.to_string()))?;

        match result {
            Value::String(token) => {
                debug!(endpoint = %self.config.endpoint, "Logged in to Zabbix");
                Ok(token)
            }
            other => Err(DashboardError::Auth(format!(
                "unexpected login result: {}",
                other
            ))),
        }
    }

    async fn send(&self, method: &str, params: Value, token: Option<&str>) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let start = Instant::now();
        let outcome = self.send_inner(&request, token).await;
        self.metrics
            .observe_upstream_latency(method, start.elapsed().as_secs_f64());

        if let Err(e) = &outcome {
            self.metrics.inc_upstream_errors(e.kind());
            debug!(method = %method, error = %e, "Zabbix call failed");
        }
        outcome
    }

    async fn send_inner(&self, request: &RpcRequest<'_>, token: Option<&str>) -> Result<Value> {
        let mut builder = self.http.post(&self.config.endpoint).json(request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::Transport(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let body: RpcResponse = response.json().await?;

        if let Some(error) = body.error {
            return Err(DashboardError::Upstream {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        body.result.ok_or_else(|| {
            DashboardError::Decode(format!("{} response has neither result nor error", request.method))
        })
    }

    async fn items_by_key(&self, host_id: &str, key: &str) -> Result<Vec<Item>> {
        validate_host_id(host_id)?;
        self.call(
            "item.get",
            json!({
                "output": ["itemid", "name", "lastvalue"],
                "search": { "key_": key },
                "hostids": host_id,
                "sortfield": "name",
            }),
        )
        .await
    }
}

#[async_trait]
impl MonitoringApi for ZabbixClient {
    async fn list_hosts(&self, filter: Value) -> Result<Vec<Host>> {
        let params = match filter {
            Value::Null => json!({}),
            other => other,
        };
        self.call("host.get", params).await
    }

    async fn cpu_load_items(&self, host_id: &str) -> Result<Vec<Item>> {
        self.items_by_key(host_id, MetricKind::Cpu.item_key()).await
    }

    async fn uptime_items(&self, host_id: &str) -> Result<Vec<Item>> {
        self.items_by_key(host_id, "system.uptime").await
    }

    async fn active_triggers(&self, host_id: &str) -> Result<Vec<Trigger>> {
        validate_host_id(host_id)?;
        self.call(
            "trigger.get",
            json!({
                "output": ["triggerid", "description", "priority", "lastchange", "expression", "status"],
                "selectDependencies": "extend",
                "skipDependent": true,
                "hostids": host_id,
                "filter": { "value": 1, "status": 0 },
                "expandDescription": true,
                "sortfield": "priority",
                "sortorder": "DESC",
            }),
        )
        .await
    }

    async fn alerts(&self, host_id: &str) -> Result<Vec<Alert>> {
        validate_host_id(host_id)?;
        self.call(
            "trigger.get",
            json!({
                "output": ["triggerid", "description", "priority", "lastchange"],
                "hostids": host_id,
                "filter": { "value": 1 },
                "expandDescription": true,
                "sortfield": "priority",
                "sortorder": "DESC",
            }),
        )
        .await
    }

    async fn problems(&self, host_id: &str) -> Result<Vec<Problem>> {
        validate_host_id(host_id)?;
        self.call(
            "problem.get",
            json!({
                "output": "extend",
                "selectAcknowledges": "extend",
                "selectTags": "extend",
                "selectSuppressionData": "extend",
                "objectids": host_id,
                "recent": true,
                "sortfield": ["eventid"],
                "sortorder": "DESC",
            }),
        )
        .await
    }

    async fn latest_samples(&self, host_id: &str, kind: MetricKind) -> Result<Vec<HistoryPoint>> {
        let items = self.items_by_key(host_id, kind.item_key()).await?;

        let Some(item) = items.first() else {
            debug!(host_id = %host_id, metric = %kind, "No item for metric on host");
            return Ok(Vec::new());
        };

        let mut params = json!({
            "output": "extend",
            "itemids": [item.itemid],
            "history": 0,
            "limit": kind.history_limit(),
            "sortfield": "clock",
            "sortorder": "DESC",
        });

        if let Some(window) = kind.lookback() {
            let now = Utc::now().timestamp();
            params["time_from"] = json!(now - window.as_secs() as i64);
            params["time_till"] = json!(now);
        }

        self.call("history.get", params).await
    }

    async fn create_trigger(&self, draft: &TriggerDraft) -> Result<TriggerIds> {
        draft.validate()?;
        self.call(
            "trigger.create",
            json!({
                "description": draft.description,
                "expression": draft.expression,
                "priority": draft.priority,
                "status": TriggerStatus::Enabled.code(),
                "type": 0,
            }),
        )
        .await
    }

    async fn update_trigger_status(
        &self,
        trigger_id: &str,
        status: TriggerStatus,
    ) -> Result<TriggerIds> {
        validate_trigger_id(trigger_id)?;
        self.call(
            "trigger.update",
            json!({
                "triggerid": trigger_id,
                "status": status.code(),
            }),
        )
        .await
    }
}

/// Builder for the Zabbix client
pub struct ZabbixClientBuilder {
    config: ZabbixConfig,
}

impl ZabbixClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ZabbixConfig::default(),
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ZabbixClient> {
        ZabbixClient::new(self.config)
    }
}

impl Default for ZabbixClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
