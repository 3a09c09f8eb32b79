//! HTTP API: Zabbix proxy routes, health check and Prometheus metrics
//!
//! Every `/api/zabbix/*` route validates its body locally, forwards one call
//! to the monitoring API and returns the upstream result as JSON.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dashboard_lib::{
    commands::{validate_host_id, TriggerDraft},
    observability::StructuredLogger,
    DashboardError, MetricKind, MonitoringApi, TriggerStatus,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn MonitoringApi>,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(api: Arc<dyn MonitoringApi>) -> Self {
        Self {
            api,
            logger: StructuredLogger::new("proxy"),
        }
    }
}

/// Error reply: `{"error": message}` with 400 or 500
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn invalid(err: DashboardError) -> Self {
        let message = match err {
            DashboardError::Validation(message) => message,
            other => other.to_string(),
        };
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

/// Request body, tolerating a missing or non-JSON body
type Body = Option<Json<Value>>;

fn body_value(body: Body) -> Value {
    body.map(|Json(value)| value).unwrap_or(Value::Null)
}

/// Read a string field that upstream may also hand out as a number
fn text_field(body: &Value, field: &str) -> String {
    match body.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn host_id(body: &Value) -> Result<String, ApiError> {
    let host_id = text_field(body, "hostid");
    validate_host_id(&host_id).map_err(ApiError::invalid)?;
    Ok(host_id)
}

/// Forward the outcome of an upstream call, mapping failures onto the reply
fn reply<T: Serialize>(
    state: &AppState,
    operation: &str,
    failure: &str,
    outcome: dashboard_lib::Result<T>,
) -> ApiResult {
    match outcome {
        Ok(value) => serde_json::to_value(value).map(Json).map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{}: {}", failure, e),
        }),
        Err(e) if e.is_validation() => Err(ApiError::invalid(e)),
        Err(e) => {
            state
                .logger
                .log_upstream_failure(operation, e.kind(), &e.to_string());
            Err(ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("{}: {}", failure, e),
            })
        }
    }
}

async fn hosts(State(state): State<Arc<AppState>>, body: Body) -> ApiResult {
    let filter = match body_value(body) {
        Value::Null => json!({}),
        other => other,
    };
    let outcome = state.api.list_hosts(filter).await;
    reply(&state, "hosts", "Failed to fetch hosts", outcome)
}

async fn cpu_load(State(state): State<Arc<AppState>>, body: Body) -> ApiResult {
    let host_id = host_id(&body_value(body))?;
    let outcome = state.api.cpu_load_items(&host_id).await;
    reply(&state, "cpu_load", "Failed to fetch CPU load", outcome)
}

async fn uptime(State(state): State<Arc<AppState>>, body: Body) -> ApiResult {
    let host_id = host_id(&body_value(body))?;
    let outcome = state.api.uptime_items(&host_id).await;
    reply(&state, "uptime", "Failed to fetch uptime", outcome)
}

async fn alerts(State(state): State<Arc<AppState>>, body: Body) -> ApiResult {
    let host_id = host_id(&body_value(body))?;
    let outcome = state.api.alerts(&host_id).await;
    reply(&state, "alerts", "Failed to fetch alerts", outcome)
}

async fn active_triggers(State(state): State<Arc<AppState>>, body: Body) -> ApiResult {
    let host_id = host_id(&body_value(body))?;
    let outcome = state.api.active_triggers(&host_id).await;
    reply(&state, "active_triggers", "Failed to fetch active triggers", outcome)
}

async fn problems(State(state): State<Arc<AppState>>, body: Body) -> ApiResult {
    let host_id = host_id(&body_value(body))?;
    let outcome = state.api.problems(&host_id).await;
    reply(&state, "problems", "Failed to fetch problems", outcome)
}

async fn latest(state: &AppState, body: Body, kind: MetricKind) -> ApiResult {
    let host_id = host_id(&body_value(body))?;
    let outcome = state.api.latest_samples(&host_id, kind).await;
    let failure = format!("Failed to fetch latest {}", kind.display_name());
    reply(state, kind.as_str(), &failure, outcome)
}

async fn cpu_load_latest(State(state): State<Arc<AppState>>, body: Body) -> ApiResult {
    latest(&state, body, MetricKind::Cpu).await
}

async fn memory_latest(State(state): State<Arc<AppState>>, body: Body) -> ApiResult {
    latest(&state, body, MetricKind::Memory).await
}

async fn disk_latest(State(state): State<Arc<AppState>>, body: Body) -> ApiResult {
    latest(&state, body, MetricKind::Disk).await
}

fn priority_field(body: &Value) -> Result<Option<u8>, ApiError> {
    let invalid = |raw: &Value| {
        ApiError::invalid(DashboardError::Validation(format!(
            "invalid priority: {}",
            raw
        )))
    };
    match body.get("priority") {
        None | Some(Value::Null) => Ok(None),
        Some(raw @ Value::Number(n)) => n
            .as_u64()
            .and_then(|p| u8::try_from(p).ok())
            .map(Some)
            .ok_or_else(|| invalid(raw)),
        Some(raw @ Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid(raw)),
        Some(raw) => Err(invalid(raw)),
    }
}

async fn create_trigger(State(state): State<Arc<AppState>>, body: Body) -> ApiResult {
    let body = body_value(body);
    let draft = TriggerDraft::new(
        text_field(&body, "hostid"),
        text_field(&body, "description"),
        text_field(&body, "expression"),
        priority_field(&body)?,
    );
    draft.validate().map_err(ApiError::invalid)?;

    let outcome = state.api.create_trigger(&draft).await;
    if let Ok(ids) = &outcome {
        state
            .logger
            .log_trigger_change(Some(&draft.host_id), &ids.triggerids, "create");
    }
    reply(&state, "trigger_create", "Failed to create trigger", outcome)
}

async fn update_trigger(State(state): State<Arc<AppState>>, body: Body) -> ApiResult {
    let body = body_value(body);
    let trigger_id = text_field(&body, "triggerid");
    let status = text_field(&body, "status");

    let mut missing = Vec::new();
    if trigger_id.trim().is_empty() {
        missing.push("triggerid");
    }
    if status.trim().is_empty() {
        missing.push("status");
    }
    if !missing.is_empty() {
        return Err(ApiError::invalid(DashboardError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        ))));
    }
    let status: TriggerStatus = status.parse().map_err(ApiError::invalid)?;

    let outcome = state.api.update_trigger_status(&trigger_id, status).await;
    if let Ok(ids) = &outcome {
        state
            .logger
            .log_trigger_change(None, &ids.triggerids, &status.to_string());
    }
    reply(&state, "trigger_update", "Failed to update trigger", outcome)
}

/// Liveness check
async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/zabbix/hosts", post(hosts))
        .route("/api/zabbix/cpu-load", post(cpu_load))
        .route("/api/zabbix/uptime", post(uptime))
        .route("/api/zabbix/alerts", post(alerts))
        .route("/api/zabbix/active-triggers", post(active_triggers))
        .route("/api/zabbix/problems", post(problems))
        .route("/api/zabbix/cpu-load-latest", post(cpu_load_latest))
        .route(
            "/api/zabbix/memory-utilization-latest",
            post(memory_latest),
        )
        .route("/api/zabbix/disk-utilization-latest", post(disk_latest))
        .route("/api/zabbix/trigger/create", post(create_trigger))
        .route("/api/zabbix/trigger/update", post(update_trigger))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting proxy server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
