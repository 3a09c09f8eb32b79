//! Scripted `MonitoringApi` used by the poller and session tests

use crate::commands::TriggerDraft;
use crate::error::{DashboardError, Result};
use crate::models::{
    Alert, HistoryPoint, Host, Item, MetricKind, Problem, Trigger, TriggerIds, TriggerStatus,
};
use crate::upstream::MonitoringApi;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// How the mock answers a metric query
#[derive(Debug, Clone)]
pub enum Reply {
    Points(Vec<HistoryPoint>),
    Delayed(Duration, Vec<HistoryPoint>),
    Fail(String),
}

pub fn point(clock: &str, value: &str) -> HistoryPoint {
    HistoryPoint {
        itemid: "1".to_string(),
        clock: clock.to_string(),
        value: value.to_string(),
        ns: "0".to_string(),
    }
}

pub fn trigger(id: &str, status: &str) -> Trigger {
    Trigger {
        triggerid: id.to_string(),
        description: format!("trigger {}", id),
        priority: "2".to_string(),
        lastchange: "1700000000".to_string(),
        expression: "last(/h/k)>1".to_string(),
        status: Some(status.to_string()),
        extra: Map::new(),
    }
}

pub fn host(id: &str, name: &str) -> Host {
    Host {
        hostid: id.to_string(),
        host: name.to_string(),
        name: name.to_string(),
        extra: Map::new(),
    }
}

#[derive(Default)]
pub struct MockApi {
    replies: Mutex<HashMap<MetricKind, Reply>>,
    pub hosts: Mutex<Vec<Host>>,
    pub triggers: Mutex<Vec<Trigger>>,
    pub fail_tables: Mutex<bool>,
    metric_calls: Mutex<HashMap<MetricKind, usize>>,
    pub command_calls: AtomicUsize,
    pub trigger_fetches: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, kind: MetricKind, reply: Reply) -> Self {
        self.set_reply(kind, reply);
        self
    }

    pub fn set_reply(&self, kind: MetricKind, reply: Reply) {
        self.replies.lock().unwrap().insert(kind, reply);
    }

    pub fn metric_calls(&self, kind: MetricKind) -> usize {
        self.metric_calls
            .lock()
            .unwrap()
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    fn tables_fail(&self) -> Result<()> {
        if *self.fail_tables.lock().unwrap() {
            return Err(DashboardError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MonitoringApi for MockApi {
    async fn list_hosts(&self, filter: Value) -> Result<Vec<Host>> {
        self.tables_fail()?;
        let hosts = self.hosts.lock().unwrap().clone();
        match filter.get("hostids").and_then(Value::as_str) {
            Some(id) => Ok(hosts.into_iter().filter(|h| h.hostid == id).collect()),
            None => Ok(hosts),
        }
    }

    async fn cpu_load_items(&self, _host_id: &str) -> Result<Vec<Item>> {
        self.tables_fail()?;
        Ok(Vec::new())
    }

    async fn uptime_items(&self, _host_id: &str) -> Result<Vec<Item>> {
        self.tables_fail()?;
        Ok(Vec::new())
    }

    async fn active_triggers(&self, _host_id: &str) -> Result<Vec<Trigger>> {
        self.tables_fail()?;
        self.trigger_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.triggers.lock().unwrap().clone())
    }

    async fn alerts(&self, _host_id: &str) -> Result<Vec<Alert>> {
        self.tables_fail()?;
        Ok(Vec::new())
    }

    async fn problems(&self, _host_id: &str) -> Result<Vec<Problem>> {
        self.tables_fail()?;
        Ok(Vec::new())
    }

    async fn latest_samples(&self, _host_id: &str, kind: MetricKind) -> Result<Vec<HistoryPoint>> {
        *self.metric_calls.lock().unwrap().entry(kind).or_insert(0) += 1;
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or(Reply::Points(Vec::new()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = match reply {
            Reply::Points(points) => Ok(points),
            Reply::Delayed(delay, points) => {
                tokio::time::sleep(delay).await;
                Ok(points)
            }
            Reply::Fail(message) => Err(DashboardError::Transport(message)),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn create_trigger(&self, draft: &TriggerDraft) -> Result<TriggerIds> {
        self.command_calls.fetch_add(1, Ordering::SeqCst);
        let id = format!("{}", 20000 + self.triggers.lock().unwrap().len());
        let mut created = trigger(&id, "0");
        created.description = draft.description.clone();
        self.triggers.lock().unwrap().push(created);
        Ok(TriggerIds {
            triggerids: vec![id],
        })
    }

    async fn update_trigger_status(
        &self,
        trigger_id: &str,
        status: TriggerStatus,
    ) -> Result<TriggerIds> {
        self.command_calls.fetch_add(1, Ordering::SeqCst);
        let mut triggers = self.triggers.lock().unwrap();
        let Some(found) = triggers.iter_mut().find(|t| t.triggerid == trigger_id) else {
            return Err(DashboardError::Upstream {
                code: -32500,
                message: "Application error.".to_string(),
                data: "No permissions to referred object or it does not exist!".to_string(),
            });
        };
        found.status = Some(status.code().to_string());
        Ok(TriggerIds {
            triggerids: vec![trigger_id.to_string()],
        })
    }
}
