//! Observability infrastructure for the dashboard
//!
//! Provides:
//! - Prometheus metrics (upstream latency and errors, poll ticks, history size)
//! - Structured JSON-friendly event logging with tracing

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for upstream request latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DashboardMetricsInner> = OnceLock::new();

struct DashboardMetricsInner {
    upstream_latency_seconds: HistogramVec,
    upstream_errors: IntCounterVec,
    poll_ticks: IntCounter,
    empty_ticks: IntCounter,
    history_records: IntGauge,
}

impl DashboardMetricsInner {
    fn new() -> Self {
        Self {
            upstream_latency_seconds: register_histogram_vec!(
                "zabbix_dashboard_upstream_latency_seconds",
                "Time spent waiting on the monitoring API, by RPC method",
                &["method"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register upstream_latency_seconds"),

            upstream_errors: register_int_counter_vec!(
                "zabbix_dashboard_upstream_errors_total",
                "Failed calls to the monitoring API, by error kind",
                &["kind"]
            )
            .expect("Failed to register upstream_errors"),

            poll_ticks: register_int_counter!(
                "zabbix_dashboard_poll_ticks_total",
                "Number of completed poll ticks"
            )
            .expect("Failed to register poll_ticks"),

            empty_ticks: register_int_counter!(
                "zabbix_dashboard_empty_ticks_total",
                "Poll ticks that produced no data for any metric"
            )
            .expect("Failed to register empty_ticks"),

            history_records: register_int_gauge!(
                "zabbix_dashboard_history_records",
                "Records currently held in the history buffer"
            )
            .expect("Failed to register history_records"),
        }
    }
}

/// Handle to the process-wide dashboard metrics.
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct DashboardMetrics {
    _private: (),
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DashboardMetricsInner {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new)
    }

    /// Record the duration of one upstream RPC call
    pub fn observe_upstream_latency(&self, method: &str, duration_secs: f64) {
        self.inner()
            .upstream_latency_seconds
            .with_label_values(&[method])
            .observe(duration_secs);
    }

    pub fn inc_upstream_errors(&self, kind: &str) {
        self.inner().upstream_errors.with_label_values(&[kind]).inc();
    }

    /// Count a completed tick; `appended` is false when the tick carried no data
    pub fn record_tick(&self, appended: bool) {
        self.inner().poll_ticks.inc();
        if !appended {
            self.inner().empty_ticks.inc();
        }
    }

    pub fn set_history_records(&self, count: usize) {
        self.inner().history_records.set(count as i64);
    }
}

/// Event-style logger for dashboard activity
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_startup(&self, version: &str, listen: &str) {
        info!(
            event = "started",
            component = %self.component,
            version = %version,
            listen = %listen,
            "Dashboard component started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            component = %self.component,
            reason = %reason,
            "Dashboard component shutting down"
        );
    }

    /// Log a failed upstream call that was turned into a user-visible message
    pub fn log_upstream_failure(&self, operation: &str, kind: &str, message: &str) {
        warn!(
            event = "upstream_failure",
            component = %self.component,
            operation = %operation,
            error_kind = %kind,
            error = %message,
            "Upstream call failed"
        );
    }

    pub fn log_tick(&self, host_id: &str, appended: bool, failures: usize, records: usize) {
        info!(
            event = "poll_tick",
            component = %self.component,
            host_id = %host_id,
            appended = appended,
            failures = failures,
            records = records,
            "Poll tick applied"
        );
    }

    pub fn log_trigger_change(&self, host_id: Option<&str>, trigger_ids: &[String], action: &str) {
        info!(
            event = "trigger_changed",
            component = %self.component,
            host_id = host_id.unwrap_or("-"),
            trigger_ids = ?trigger_ids,
            action = %action,
            "Trigger change accepted upstream"
        );
    }
}
