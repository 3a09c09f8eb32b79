//! Core data models for the dashboard
//!
//! Upstream records (hosts, items, triggers, alerts, problems) are kept close
//! to what Zabbix returns: the fields the dashboard reads are typed, anything
//! else is carried through untouched in `extra`.

use crate::error::{DashboardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Metric series charted on the host-detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
}

impl MetricKind {
    /// All kinds in chart order
    pub const ALL: [MetricKind; 3] = [MetricKind::Cpu, MetricKind::Memory, MetricKind::Disk];

    /// Zabbix item key searched for this metric
    pub fn item_key(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "system.cpu.load",
            MetricKind::Memory => "vm.memory.size[pavailable]",
            MetricKind::Disk => "vfs.fs.dependent.size[/,pused]",
        }
    }

    /// Number of history points requested per query
    pub fn history_limit(&self) -> u32 {
        match self {
            MetricKind::Cpu => 10,
            MetricKind::Memory | MetricKind::Disk => 1,
        }
    }

    /// Lookback window applied to the history query, if any
    pub fn lookback(&self) -> Option<Duration> {
        match self {
            MetricKind::Memory => Some(Duration::from_secs(60)),
            MetricKind::Cpu | MetricKind::Disk => None,
        }
    }

    /// Series label used by the chart
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU Load (per core, avg1)",
            MetricKind::Memory => "Memory Utilization (% available)",
            MetricKind::Disk => "Disk Utilization (% used)",
        }
    }

    /// Human-readable name used in status and error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU load",
            MetricKind::Memory => "memory utilization",
            MetricKind::Disk => "disk utilization",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Disk => "disk",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(MetricKind::Cpu),
            "memory" | "mem" => Ok(MetricKind::Memory),
            "disk" => Ok(MetricKind::Disk),
            other => Err(DashboardError::Validation(format!(
                "unknown metric kind: {}",
                other
            ))),
        }
    }
}

/// Raw history row as returned by `history.get`, most recent first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    #[serde(default)]
    pub itemid: String,
    pub clock: String,
    pub value: String,
    #[serde(default)]
    pub ns: String,
}

impl HistoryPoint {
    /// Observation time derived from `clock` (seconds) and `ns` (nanoseconds)
    pub fn observed_at(&self) -> Result<DateTime<Utc>> {
        let secs: i64 = self
            .clock
            .trim()
            .parse()
            .map_err(|_| DashboardError::MalformedTimestamp(self.clock.clone()))?;

        let nanos: u32 = if self.ns.trim().is_empty() {
            0
        } else {
            self.ns
                .trim()
                .parse()
                .map_err(|_| DashboardError::MalformedTimestamp(self.ns.clone()))?
        };

        DateTime::from_timestamp(secs, nanos)
            .ok_or_else(|| DashboardError::MalformedTimestamp(self.clock.clone()))
    }

    /// Numeric value of the point; NaN and infinities are malformed
    pub fn numeric_value(&self) -> Result<f64> {
        self.value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| DashboardError::MalformedValue(self.value.clone()))
    }
}

/// One reading of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub kind: MetricKind,
    /// None when the upstream query returned no point
    pub value: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl MetricSample {
    /// Build a sample from the most recent history point.
    ///
    /// An empty slice is a valid "no data" reading stamped with `fetched_at`.
    /// A point with a malformed clock or value is an error.
    pub fn from_points(
        kind: MetricKind,
        points: &[HistoryPoint],
        fetched_at: DateTime<Utc>,
    ) -> Result<Self> {
        match points.first() {
            Some(point) => Ok(Self {
                kind,
                value: Some(point.numeric_value()?),
                observed_at: point.observed_at()?,
            }),
            None => Ok(Self::empty(kind, fetched_at)),
        }
    }

    pub fn empty(kind: MetricKind, fetched_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            value: None,
            observed_at: fetched_at,
        }
    }
}

/// Monitored host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    #[serde(default)]
    pub hostid: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Metric source on a host (CPU load, uptime, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub itemid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub lastvalue: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Alerting rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub triggerid: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub lastchange: String,
    #[serde(default)]
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Trigger {
    /// Parsed status; None when upstream did not report one
    pub fn status(&self) -> Option<TriggerStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Trigger currently in the problem state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub triggerid: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub lastchange: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Active, unresolved trigger firing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub eventid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub clock: String,
    #[serde(default)]
    pub acknowledged: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Problem {
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged == "1"
    }
}

/// Trigger enabled/disabled state, encoded by Zabbix as 0/1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerStatus {
    Enabled,
    Disabled,
}

impl TriggerStatus {
    pub fn code(&self) -> u8 {
        match self {
            TriggerStatus::Enabled => 0,
            TriggerStatus::Disabled => 1,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(TriggerStatus::Enabled),
            1 => Ok(TriggerStatus::Disabled),
            other => Err(DashboardError::Validation(format!(
                "invalid trigger status: {}",
                other
            ))),
        }
    }

    /// The opposite status
    pub fn toggled(&self) -> Self {
        match self {
            TriggerStatus::Enabled => TriggerStatus::Disabled,
            TriggerStatus::Disabled => TriggerStatus::Enabled,
        }
    }
}

impl FromStr for TriggerStatus {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "0" | "enabled" => Ok(TriggerStatus::Enabled),
            "1" | "disabled" => Ok(TriggerStatus::Disabled),
            other => Err(DashboardError::Validation(format!(
                "invalid trigger status: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for TriggerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerStatus::Enabled => f.write_str("enabled"),
            TriggerStatus::Disabled => f.write_str("disabled"),
        }
    }
}

/// Result of `trigger.create` / `trigger.update`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TriggerIds {
    #[serde(default)]
    pub triggerids: Vec<String>,
}

/// Host with counts shown on the overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSummary {
    #[serde(flatten)]
    pub host: Host,
    pub trigger_count: usize,
    pub alert_count: usize,
    pub problem_count: usize,
}

/// Zabbix severity name for a priority/severity code
pub fn severity_name(code: &str) -> &'static str {
    match code.trim() {
        "0" => "Not classified",
        "1" => "Information",
        "2" => "Warning",
        "3" => "Average",
        "4" => "High",
        "5" => "Disaster",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(clock: &str, ns: &str, value: &str) -> HistoryPoint {
        HistoryPoint {
            itemid: "42237".to_string(),
            clock: clock.to_string(),
            value: value.to_string(),
            ns: ns.to_string(),
        }
    }

    #[test]
    fn test_sample_from_points_uses_most_recent() {
        let points = vec![
            point("1700000060", "500000000", "0.75"),
            point("1700000000", "0", "0.5"),
        ];
        let sample = MetricSample::from_points(MetricKind::Cpu, &points, Utc::now()).unwrap();

        assert_eq!(sample.value, Some(0.75));
        assert_eq!(sample.observed_at.timestamp(), 1_700_000_060);
        assert_eq!(sample.observed_at.timestamp_subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_sample_from_empty_points_is_null() {
        let fetched_at = Utc::now();
        let sample = MetricSample::from_points(MetricKind::Disk, &[], fetched_at).unwrap();

        assert_eq!(sample.value, None);
        assert_eq!(sample.observed_at, fetched_at);
    }

    #[test]
    fn test_malformed_clock_fails() {
        let points = vec![point("yesterday", "0", "1.0")];
        let err = MetricSample::from_points(MetricKind::Cpu, &points, Utc::now()).unwrap_err();
        assert!(matches!(err, DashboardError::MalformedTimestamp(_)));

        let points = vec![point("1700000000", "abc", "1.0")];
        let err = MetricSample::from_points(MetricKind::Cpu, &points, Utc::now()).unwrap_err();
        assert!(matches!(err, DashboardError::MalformedTimestamp(_)));
    }

    #[test]
    fn test_malformed_value_fails() {
        let points = vec![point("1700000000", "0", "n/a")];
        let err = MetricSample::from_points(MetricKind::Memory, &points, Utc::now()).unwrap_err();
        assert!(matches!(err, DashboardError::MalformedValue(_)));
    }

    #[test]
    fn test_non_finite_value_fails() {
        for raw in ["NaN", "inf", "-infinity", "Infinity"] {
            let points = vec![point("1700000000", "0", raw)];
            let err = MetricSample::from_points(MetricKind::Cpu, &points, Utc::now()).unwrap_err();
            assert!(
                matches!(&err, DashboardError::MalformedValue(v) if v == raw),
                "{} should be malformed",
                raw
            );
        }
    }

    #[test]
    fn test_missing_ns_defaults_to_zero() {
        let p: HistoryPoint =
            serde_json::from_str(r#"{"itemid":"1","clock":"1700000000","value":"3"}"#).unwrap();
        assert_eq!(p.observed_at().unwrap().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_metric_kind_parse() {
        assert_eq!("CPU".parse::<MetricKind>().unwrap(), MetricKind::Cpu);
        assert_eq!("mem".parse::<MetricKind>().unwrap(), MetricKind::Memory);
        assert!("network".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_trigger_status_codes() {
        assert_eq!(TriggerStatus::Enabled.code(), 0);
        assert_eq!(TriggerStatus::Disabled.toggled(), TriggerStatus::Enabled);
        assert_eq!(TriggerStatus::from_code(1).unwrap(), TriggerStatus::Disabled);
        assert!(TriggerStatus::from_code(7).is_err());
    }

    #[test]
    fn test_trigger_keeps_unknown_fields() {
        let raw = r#"{
            "triggerid": "13491",
            "description": "High CPU load on web-01",
            "priority": "4",
            "lastchange": "1700000000",
            "expression": "avg(/web-01/system.cpu.load,5m)>5",
            "status": "0",
            "dependencies": []
        }"#;
        let trigger: Trigger = serde_json::from_str(raw).unwrap();

        assert_eq!(trigger.status(), Some(TriggerStatus::Enabled));
        assert!(trigger.extra.contains_key("dependencies"));

        let back = serde_json::to_value(&trigger).unwrap();
        assert_eq!(back["dependencies"], serde_json::json!([]));
    }

    #[test]
    fn test_severity_names() {
        assert_eq!(severity_name("2"), "Warning");
        assert_eq!(severity_name("5"), "Disaster");
        assert_eq!(severity_name("x"), "Unknown");
    }
}
