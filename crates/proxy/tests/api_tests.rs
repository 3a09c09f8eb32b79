//! Integration tests for the proxy API endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use dashboard_lib::{
    Alert, DashboardError, HistoryPoint, Host, Item, MetricKind, MonitoringApi, Problem, Result,
    Trigger, TriggerDraft, TriggerIds, TriggerStatus,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use zabbix_proxy::api::{create_router, AppState};

/// Canned upstream that records every call it receives
#[derive(Default)]
struct StubApi {
    calls: AtomicUsize,
    fail: bool,
    last_draft: Mutex<Option<TriggerDraft>>,
    last_update: Mutex<Option<(String, TriggerStatus)>>,
}

impl StubApi {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn hit(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DashboardError::Upstream {
                code: -32602,
                message: "Invalid params.".to_string(),
                data: "Session terminated, re-login, please.".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MonitoringApi for StubApi {
    async fn list_hosts(&self, filter: Value) -> Result<Vec<Host>> {
        self.hit()?;
        let name = filter
            .get("hostids")
            .and_then(Value::as_str)
            .unwrap_or("web-01")
            .to_string();
        Ok(vec![Host {
            hostid: "10084".to_string(),
            host: name.clone(),
            name,
            extra: Map::new(),
        }])
    }

    async fn cpu_load_items(&self, _host_id: &str) -> Result<Vec<Item>> {
        self.hit()?;
        Ok(vec![Item {
            itemid: "42237".to_string(),
            name: "Load average (1m avg)".to_string(),
            lastvalue: "0.42".to_string(),
            extra: Map::new(),
        }])
    }

    async fn uptime_items(&self, _host_id: &str) -> Result<Vec<Item>> {
        self.hit()?;
        Ok(Vec::new())
    }

    async fn active_triggers(&self, _host_id: &str) -> Result<Vec<Trigger>> {
        self.hit()?;
        Ok(Vec::new())
    }

    async fn alerts(&self, _host_id: &str) -> Result<Vec<Alert>> {
        self.hit()?;
        Ok(Vec::new())
    }

    async fn problems(&self, _host_id: &str) -> Result<Vec<Problem>> {
        self.hit()?;
        Ok(Vec::new())
    }

    async fn latest_samples(&self, _host_id: &str, kind: MetricKind) -> Result<Vec<HistoryPoint>> {
        self.hit()?;
        if kind == MetricKind::Disk {
            return Ok(Vec::new());
        }
        Ok(vec![HistoryPoint {
            itemid: "42244".to_string(),
            clock: "1700000000".to_string(),
            value: "61.2".to_string(),
            ns: "0".to_string(),
        }])
    }

    async fn create_trigger(&self, draft: &TriggerDraft) -> Result<TriggerIds> {
        self.hit()?;
        *self.last_draft.lock().unwrap() = Some(draft.clone());
        Ok(TriggerIds {
            triggerids: vec!["24153".to_string()],
        })
    }

    async fn update_trigger_status(
        &self,
        trigger_id: &str,
        status: TriggerStatus,
    ) -> Result<TriggerIds> {
        self.hit()?;
        *self.last_update.lock().unwrap() = Some((trigger_id.to_string(), status));
        Ok(TriggerIds {
            triggerids: vec![trigger_id.to_string()],
        })
    }
}

fn setup_test_app(api: Arc<StubApi>) -> Router {
    create_router(Arc::new(AppState::new(api)))
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_hosts_passes_filter_through() {
    let api = Arc::new(StubApi::default());
    let app = setup_test_app(api.clone());

    let (status, body) = post(app, "/api/zabbix/hosts", json!({ "hostids": "db-01" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "db-01");
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_hosts_without_body() {
    let api = Arc::new(StubApi::default());
    let app = setup_test_app(api.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/zabbix/hosts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_hostid_is_rejected_locally() {
    let routes = [
        "/api/zabbix/cpu-load",
        "/api/zabbix/uptime",
        "/api/zabbix/alerts",
        "/api/zabbix/active-triggers",
        "/api/zabbix/problems",
        "/api/zabbix/cpu-load-latest",
        "/api/zabbix/memory-utilization-latest",
        "/api/zabbix/disk-utilization-latest",
    ];
    let api = Arc::new(StubApi::default());

    for route in routes {
        let (status, body) = post(setup_test_app(api.clone()), route, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", route);
        assert_eq!(body["error"], "Missing required field: hostid");
    }
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_numeric_hostid_is_accepted() {
    let api = Arc::new(StubApi::default());
    let (status, body) = post(
        setup_test_app(api),
        "/api/zabbix/cpu-load",
        json!({ "hostid": 10084 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["lastvalue"], "0.42");
}

#[tokio::test]
async fn test_latest_returns_history_points() {
    let api = Arc::new(StubApi::default());

    let (status, body) = post(
        setup_test_app(api.clone()),
        "/api/zabbix/memory-utilization-latest",
        json!({ "hostid": "10084" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["value"], "61.2");
    assert_eq!(body[0]["clock"], "1700000000");

    let (status, body) = post(
        setup_test_app(api),
        "/api/zabbix/disk-utilization-latest",
        json!({ "hostid": "10084" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_upstream_failure_is_500() {
    let api = Arc::new(StubApi::failing());
    let (status, body) = post(
        setup_test_app(api),
        "/api/zabbix/problems",
        json!({ "hostid": "10084" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Failed to fetch problems"));
    assert!(message.contains("Session terminated"));
}

#[tokio::test]
async fn test_create_trigger_defaults_priority() {
    let api = Arc::new(StubApi::default());
    let (status, body) = post(
        setup_test_app(api.clone()),
        "/api/zabbix/trigger/create",
        json!({
            "hostid": "10084",
            "description": "High CPU",
            "expression": "avg(/web-01/system.cpu.load,5m)>5"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["triggerids"][0], "24153");
    let draft = api.last_draft.lock().unwrap().clone().unwrap();
    assert_eq!(draft.priority, 2);
    assert_eq!(draft.host_id, "10084");
}

#[tokio::test]
async fn test_create_trigger_missing_fields() {
    let api = Arc::new(StubApi::default());
    let (status, body) = post(
        setup_test_app(api.clone()),
        "/api/zabbix/trigger/create",
        json!({ "hostid": "10084", "description": "", "expression": "expr", "priority": 2 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: description");
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_trigger_rejects_bad_priority() {
    let api = Arc::new(StubApi::default());
    let (status, _) = post(
        setup_test_app(api.clone()),
        "/api/zabbix/trigger/create",
        json!({ "hostid": "10084", "description": "d", "expression": "e", "priority": 9 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_trigger_status() {
    let api = Arc::new(StubApi::default());
    let (status, body) = post(
        setup_test_app(api.clone()),
        "/api/zabbix/trigger/update",
        json!({ "triggerid": "13491", "status": 1 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["triggerids"][0], "13491");
    assert_eq!(
        api.last_update.lock().unwrap().clone(),
        Some(("13491".to_string(), TriggerStatus::Disabled))
    );
}

#[tokio::test]
async fn test_update_trigger_missing_fields() {
    let api = Arc::new(StubApi::default());
    let (status, body) = post(
        setup_test_app(api.clone()),
        "/api/zabbix/trigger/update",
        json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: triggerid, status");

    let (status, _) = post(
        setup_test_app(api.clone()),
        "/api/zabbix/trigger/update",
        json!({ "triggerid": "13491", "status": "paused" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_healthz_returns_ok() {
    let app = setup_test_app(Arc::new(StubApi::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let _metrics = dashboard_lib::DashboardMetrics::new();
    let app = setup_test_app(Arc::new(StubApi::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = setup_test_app(Arc::new(StubApi::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/zabbix/unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
