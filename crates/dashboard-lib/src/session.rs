//! Host detail session
//!
//! A `HostSession` owns everything the host-detail view shows for one host:
//! the six tables, the uptime, the rolling metric history and the last
//! user-visible error. State lives behind a mutex that is never held across
//! an await; upstream calls run unlocked and their results are committed
//! only while the view is still open.

use crate::commands::TriggerDraft;
use crate::error::{DashboardError, Result};
use crate::history::{HistoryBuffer, HistoryConfig, HistoryRecord};
use crate::models::{Alert, Item, MetricKind, Problem, Trigger, TriggerIds, TriggerStatus};
use crate::observability::StructuredLogger;
use crate::poller::{fetch_sample, Poller, PollerConfig, PollerHandle};
use crate::upstream::MonitoringApi;
use chrono::Utc;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Name shown when the host lookup comes back empty
pub const UNKNOWN_HOST: &str = "Unknown Host";

/// Everything the host-detail view displays
#[derive(Debug, Clone)]
pub struct HostView {
    pub host_id: String,
    pub host_name: String,
    pub cpu_items: Vec<Item>,
    pub uptime_items: Vec<Item>,
    pub alerts: Vec<Alert>,
    pub triggers: Vec<Trigger>,
    pub problems: Vec<Problem>,
    pub history: HistoryBuffer,
    /// Most recent user-visible failure message
    pub last_error: Option<String>,
    /// Set once the initial load has succeeded
    pub loaded: bool,
}

impl HostView {
    fn new(host_id: &str, history: HistoryConfig) -> Self {
        Self {
            host_id: host_id.to_string(),
            host_name: UNKNOWN_HOST.to_string(),
            cpu_items: Vec::new(),
            uptime_items: Vec::new(),
            alerts: Vec::new(),
            triggers: Vec::new(),
            problems: Vec::new(),
            history: HistoryBuffer::with_config(history),
            last_error: None,
            loaded: false,
        }
    }

    /// Uptime in seconds from the first uptime item, if it parses
    pub fn uptime_secs(&self) -> Option<u64> {
        self.uptime_items
            .first()
            .and_then(|item| item.lastvalue.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| secs as u64)
    }
}

pub(crate) struct ViewState {
    pub(crate) view: HostView,
    pub(crate) closed: bool,
}

pub(crate) type SharedView = Arc<Mutex<ViewState>>;

pub(crate) fn lock_view(state: &SharedView) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn failure_message(kind: MetricKind) -> String {
    format!("Failed to fetch latest {}", kind.display_name())
}

/// One host's detail view and the operations it supports
pub struct HostSession {
    api: Arc<dyn MonitoringApi>,
    host_id: String,
    state: SharedView,
    logger: StructuredLogger,
}

impl HostSession {
    pub fn new(api: Arc<dyn MonitoringApi>, host_id: impl Into<String>, history: HistoryConfig) -> Self {
        let host_id = host_id.into();
        let view = HostView::new(&host_id, history);
        Self {
            api,
            host_id,
            state: Arc::new(Mutex::new(ViewState {
                view,
                closed: false,
            })),
            logger: StructuredLogger::new("host_session"),
        }
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    /// Copy of the current view
    pub fn snapshot(&self) -> HostView {
        lock_view(&self.state).view.clone()
    }

    pub(crate) fn shared_state(&self) -> SharedView {
        self.state.clone()
    }

    /// Fetch the host name, the tables and the first metric readings.
    ///
    /// The six tables are all-or-nothing: one failure fails the load and
    /// leaves the view untouched. Metric failures only blank their field.
    pub async fn load(&self) -> Result<()> {
        let api = self.api.as_ref();
        let host_id = self.host_id.as_str();

        let tables = async {
            tokio::try_join!(
                api.list_hosts(json!({ "hostids": host_id, "output": ["name"] })),
                api.cpu_load_items(host_id),
                api.uptime_items(host_id),
                api.alerts(host_id),
                api.active_triggers(host_id),
                api.problems(host_id),
            )
        };
        let (tables, cpu, memory, disk) = tokio::join!(
            tables,
            fetch_sample(api, host_id, MetricKind::Cpu),
            fetch_sample(api, host_id, MetricKind::Memory),
            fetch_sample(api, host_id, MetricKind::Disk),
        );

        let (hosts, cpu_items, uptime_items, alerts, triggers, problems) = match tables {
            Ok(tables) => tables,
            Err(e) => {
                self.record_failure("load", "Failed to load host details", &e);
                return Err(e);
            }
        };

        let mut readings = [None; 3];
        let mut metric_failure = None;
        for (slot, (kind, outcome)) in readings.iter_mut().zip([
            (MetricKind::Cpu, cpu),
            (MetricKind::Memory, memory),
            (MetricKind::Disk, disk),
        ]) {
            match outcome {
                Ok(sample) => *slot = sample.value,
                Err(e) => {
                    self.logger
                        .log_upstream_failure(kind.as_str(), e.kind(), &e.to_string());
                    metric_failure = Some(failure_message(kind));
                }
            }
        }

        let mut state = lock_view(&self.state);
        if state.closed {
            debug!(host_id = %self.host_id, "Discarding load results for closed view");
            return Ok(());
        }
        let view = &mut state.view;
        view.host_name = hosts
            .into_iter()
            .next()
            .map(|h| h.name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_HOST.to_string());
        view.cpu_items = cpu_items;
        view.uptime_items = uptime_items;
        view.alerts = alerts;
        view.triggers = triggers;
        view.problems = problems;
        view.last_error = metric_failure;
        view.history
            .record_tick(readings[0], readings[1], readings[2], Utc::now());
        view.loaded = true;

        info!(
            host_id = %self.host_id,
            host_name = %view.host_name,
            triggers = view.triggers.len(),
            problems = view.problems.len(),
            "Host view loaded"
        );
        Ok(())
    }

    /// Refetch one metric and patch it into the latest record.
    ///
    /// Returns the patched record, or None when nothing changed (no data,
    /// or the view was closed while the query was in flight).
    pub async fn refresh_metric(&self, kind: MetricKind) -> Result<Option<HistoryRecord>> {
        let sample = match fetch_sample(self.api.as_ref(), &self.host_id, kind).await {
            Ok(sample) => sample,
            Err(e) => {
                let message = failure_message(kind);
                self.record_failure(kind.as_str(), &message, &e);
                return Err(e);
            }
        };

        let mut state = lock_view(&self.state);
        if state.closed {
            return Ok(None);
        }
        Ok(state.view.history.apply_sample(&sample).cloned())
    }

    /// Start interval polling; the returned handle stops it
    pub fn start_polling(&self, config: PollerConfig) -> PollerHandle {
        Poller::spawn(
            self.api.clone(),
            self.host_id.clone(),
            self.state.clone(),
            config,
        )
    }

    /// Create a trigger on this host, then refresh the trigger table
    pub async fn create_trigger(
        &self,
        description: impl Into<String>,
        expression: impl Into<String>,
        priority: Option<u8>,
    ) -> Result<TriggerIds> {
        let draft = TriggerDraft::new(self.host_id.clone(), description, expression, priority);
        let outcome = match draft.validate() {
            Ok(()) => self.api.create_trigger(&draft).await,
            Err(e) => Err(e),
        };
        let ids = match outcome {
            Ok(ids) => ids,
            Err(e) => {
                self.record_failure("create_trigger", "Failed to create trigger", &e);
                return Err(e);
            }
        };

        self.logger
            .log_trigger_change(Some(&self.host_id), &ids.triggerids, "create");
        self.refetch_triggers().await?;
        Ok(ids)
    }

    /// Set a trigger's status, then refresh the trigger table
    pub async fn update_trigger_status(
        &self,
        trigger_id: &str,
        status: TriggerStatus,
    ) -> Result<TriggerIds> {
        let ids = match self.api.update_trigger_status(trigger_id, status).await {
            Ok(ids) => ids,
            Err(e) => {
                self.record_failure("update_trigger", "Failed to update trigger status", &e);
                return Err(e);
            }
        };

        let action = match status {
            TriggerStatus::Enabled => "enable",
            TriggerStatus::Disabled => "disable",
        };
        self.logger
            .log_trigger_change(Some(&self.host_id), &ids.triggerids, action);
        self.refetch_triggers().await?;
        Ok(ids)
    }

    /// Flip a listed trigger between enabled and disabled.
    ///
    /// A trigger without a reported status counts as disabled.
    pub async fn toggle_trigger(&self, trigger_id: &str) -> Result<TriggerStatus> {
        let current = {
            let state = lock_view(&self.state);
            state
                .view
                .triggers
                .iter()
                .find(|t| t.triggerid == trigger_id)
                .map(|t| t.status().unwrap_or(TriggerStatus::Disabled))
        };
        let Some(current) = current else {
            return Err(DashboardError::Validation(format!(
                "trigger {} is not listed for host {}",
                trigger_id, self.host_id
            )));
        };

        let next = current.toggled();
        self.update_trigger_status(trigger_id, next).await?;
        Ok(next)
    }

    /// Tear down the view; later results from in-flight work are dropped
    pub fn close(&self) {
        let mut state = lock_view(&self.state);
        if !state.closed {
            state.closed = true;
            debug!(host_id = %self.host_id, "Host view closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        lock_view(&self.state).closed
    }

    async fn refetch_triggers(&self) -> Result<()> {
        match self.api.active_triggers(&self.host_id).await {
            Ok(triggers) => {
                let mut state = lock_view(&self.state);
                if !state.closed {
                    state.view.triggers = triggers;
                }
                Ok(())
            }
            Err(e) => {
                self.record_failure("active_triggers", "Failed to refresh triggers", &e);
                Err(e)
            }
        }
    }

    fn record_failure(&self, operation: &str, message: &str, error: &DashboardError) {
        self.logger
            .log_upstream_failure(operation, error.kind(), &error.to_string());
        let mut state = lock_view(&self.state);
        if !state.closed {
            state.view.last_error = Some(message.to_string());
        }
    }
}

impl Drop for HostSession {
    fn drop(&mut self) {
        self.close();
    }
}
