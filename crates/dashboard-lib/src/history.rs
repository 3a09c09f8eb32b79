//! Rolling history of CPU, memory and disk readings
//!
//! The buffer keeps one record per time slice, bounded to a fixed window with
//! FIFO eviction. It is updated in two ways:
//! - batch updates from the poller append a new slice
//! - single-metric updates from a manual refresh patch the latest slice

use crate::models::{MetricKind, MetricSample};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default window size (one hour at one record per minute)
pub const DEFAULT_CAPACITY: usize = 60;

/// Default display offset for timestamps (UTC+05:30)
pub const DEFAULT_DISPLAY_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Configuration for the history buffer
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of records kept
    pub capacity: usize,
    /// Offset used when rendering record timestamps
    pub display_offset: FixedOffset,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            display_offset: FixedOffset::east_opt(DEFAULT_DISPLAY_OFFSET_SECS)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl HistoryConfig {
    /// Config with the display offset given in minutes east of UTC.
    ///
    /// Out-of-range offsets fall back to the default.
    pub fn with_offset_minutes(minutes: i32) -> Self {
        let mut config = Self::default();
        if let Some(offset) = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
        {
            config.display_offset = offset;
        }
        config
    }
}

/// One time slice of the chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Display-formatted time of day
    pub timestamp: String,
    pub recorded_at: DateTime<Utc>,
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub disk: Option<f64>,
}

impl HistoryRecord {
    pub fn value(&self, kind: MetricKind) -> Option<f64> {
        match kind {
            MetricKind::Cpu => self.cpu,
            MetricKind::Memory => self.memory,
            MetricKind::Disk => self.disk,
        }
    }

    fn set(&mut self, kind: MetricKind, value: Option<f64>) {
        match kind {
            MetricKind::Cpu => self.cpu = value,
            MetricKind::Memory => self.memory = value,
            MetricKind::Disk => self.disk = value,
        }
    }

    fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none() && self.disk.is_none()
    }
}

/// One line of the chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub kind: MetricKind,
    pub label: &'static str,
    pub values: Vec<Option<f64>>,
}

/// Buffer contents laid out for a multi-series time chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

impl Chart {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Bounded, chronologically ordered history of readings
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    records: VecDeque<HistoryRecord>,
    config: HistoryConfig,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBuffer {
    /// Create an empty buffer with default configuration
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    /// Create an empty buffer with full configuration
    pub fn with_config(config: HistoryConfig) -> Self {
        let config = HistoryConfig {
            capacity: config.capacity.max(1),
            ..config
        };
        Self {
            records: VecDeque::with_capacity(config.capacity),
            config,
        }
    }

    /// Append one slice built from a poll tick.
    ///
    /// Returns false (and leaves the buffer untouched) when all three values
    /// are missing.
    pub fn record_tick(
        &mut self,
        cpu: Option<f64>,
        memory: Option<f64>,
        disk: Option<f64>,
        at: DateTime<Utc>,
    ) -> bool {
        let record = HistoryRecord {
            timestamp: self.label(at),
            recorded_at: at,
            cpu,
            memory,
            disk,
        };

        if record.is_empty() {
            return false;
        }

        self.records.push_back(record);
        while self.records.len() > self.config.capacity {
            self.records.pop_front();
        }
        true
    }

    /// Merge one manual reading into the latest slice.
    ///
    /// Only the sample's metric is overwritten and the slice takes the
    /// sample's observation time. An empty buffer gets a new slice. Samples
    /// without a value are ignored. Returns the touched record.
    pub fn apply_sample(&mut self, sample: &MetricSample) -> Option<&HistoryRecord> {
        let value = sample.value?;
        let timestamp = self.label(sample.observed_at);

        match self.records.back_mut() {
            Some(last) => {
                last.set(sample.kind, Some(value));
                last.timestamp = timestamp;
                last.recorded_at = sample.observed_at;
            }
            None => {
                let mut record = HistoryRecord {
                    timestamp,
                    recorded_at: sample.observed_at,
                    cpu: None,
                    memory: None,
                    disk: None,
                };
                record.set(sample.kind, Some(value));
                self.records.push_back(record);
            }
        }

        self.records.back()
    }

    /// Chart labels and one series per metric, in buffer order
    pub fn chart(&self) -> Chart {
        Chart {
            labels: self.records.iter().map(|r| r.timestamp.clone()).collect(),
            series: MetricKind::ALL
                .iter()
                .map(|kind| ChartSeries {
                    kind: *kind,
                    label: kind.label(),
                    values: self.records.iter().map(|r| r.value(*kind)).collect(),
                })
                .collect(),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&HistoryRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Display label for an instant, e.g. `3:04:05 pm`
    pub fn label(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.config.display_offset)
            .format("%-I:%M:%S %P")
            .to_string()
    }
}
