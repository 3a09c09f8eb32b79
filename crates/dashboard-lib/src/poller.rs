//! Interval polling of the host-detail metrics
//!
//! Every tick queries CPU, memory and disk concurrently, waits for all three
//! and commits them to the history as one batch update. A failed query only
//! blanks its own field. Ticks run inside the loop body, so they never
//! overlap; timer ticks missed while a slow tick was pending are skipped.

use crate::error::Result;
use crate::models::{MetricKind, MetricSample};
use crate::observability::{DashboardMetrics, StructuredLogger};
use crate::session::{failure_message, lock_view, SharedView};
use crate::upstream::MonitoringApi;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest allowed time between ticks
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Longest allowed time between ticks
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for the poller
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between ticks (default: 60 seconds)
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl PollerConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval: interval.clamp(MIN_INTERVAL, MAX_INTERVAL),
        }
    }
}

/// What one tick produced
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub disk: Option<f64>,
    /// Metrics whose query failed this tick
    pub failed: Vec<MetricKind>,
    /// Whether a record was appended
    pub appended: bool,
}

/// Fetch the latest sample for one metric
pub(crate) async fn fetch_sample(
    api: &dyn MonitoringApi,
    host_id: &str,
    kind: MetricKind,
) -> Result<MetricSample> {
    let points = api.latest_samples(host_id, kind).await?;
    MetricSample::from_points(kind, &points, Utc::now())
}

/// Periodic batch updater for one host's history
pub(crate) struct Poller {
    api: Arc<dyn MonitoringApi>,
    host_id: String,
    state: SharedView,
    stopped: Arc<AtomicBool>,
    config: PollerConfig,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl Poller {
    /// Start polling on the current tokio runtime
    pub(crate) fn spawn(
        api: Arc<dyn MonitoringApi>,
        host_id: String,
        state: SharedView,
        config: PollerConfig,
    ) -> PollerHandle {
        let stopped = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let poller = Poller {
            api,
            host_id,
            state: state.clone(),
            stopped: stopped.clone(),
            config,
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::new("poller"),
        };

        let task = tokio::spawn(poller.run(shutdown_rx));

        PollerHandle {
            state,
            stopped,
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let period = self.config.interval.clamp(MIN_INTERVAL, MAX_INTERVAL);
        info!(
            host_id = %self.host_id,
            interval_secs = period.as_secs(),
            "Starting host poller"
        );

        // The initial load provides the first record, so wait one full period
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    info!(host_id = %self.host_id, "Shutting down host poller");
                    break;
                }
            }
        }
    }

    /// Run one tick and commit it; None when the view was torn down meanwhile
    pub(crate) async fn tick(&self) -> Option<TickReport> {
        let api = self.api.as_ref();
        let (cpu, memory, disk) = tokio::join!(
            fetch_sample(api, &self.host_id, MetricKind::Cpu),
            fetch_sample(api, &self.host_id, MetricKind::Memory),
            fetch_sample(api, &self.host_id, MetricKind::Disk),
        );

        let mut report = TickReport::default();
        let mut last_failure = None;
        for (kind, outcome) in [
            (MetricKind::Cpu, cpu),
            (MetricKind::Memory, memory),
            (MetricKind::Disk, disk),
        ] {
            let value = match outcome {
                Ok(sample) => sample.value,
                Err(e) => {
                    warn!(host_id = %self.host_id, metric = %kind, error = %e, "Metric query failed");
                    self.logger
                        .log_upstream_failure(kind.as_str(), e.kind(), &e.to_string());
                    report.failed.push(kind);
                    last_failure = Some(failure_message(kind));
                    None
                }
            };
            match kind {
                MetricKind::Cpu => report.cpu = value,
                MetricKind::Memory => report.memory = value,
                MetricKind::Disk => report.disk = value,
            }
        }

        let records = {
            let mut state = lock_view(&self.state);
            if self.stopped.load(Ordering::SeqCst) || state.closed {
                debug!(host_id = %self.host_id, "Discarding tick results after teardown");
                return None;
            }
            if let Some(message) = last_failure {
                state.view.last_error = Some(message);
            }
            report.appended =
                state
                    .view
                    .history
                    .record_tick(report.cpu, report.memory, report.disk, Utc::now());
            state.view.history.len()
        };

        self.metrics.record_tick(report.appended);
        self.metrics.set_history_records(records);
        self.logger
            .log_tick(&self.host_id, report.appended, report.failed.len(), records);

        Some(report)
    }
}

/// Handle to a running poller.
///
/// Cancelling (or dropping) the handle stops the timer. Once `cancel`
/// returns, no tick result is applied to the view, even from requests that
/// were already in flight.
pub struct PollerHandle {
    state: SharedView,
    stopped: Arc<AtomicBool>,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop the poller
    pub fn cancel(&self) {
        {
            // Taking the view lock waits out a commit that is already underway
            let _state = lock_view(&self.state);
            self.stopped.store(true, Ordering::SeqCst);
        }
        let _ = self.shutdown.send(());
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Whether the background task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if !self.is_cancelled() {
            self.cancel();
        }
    }
}
