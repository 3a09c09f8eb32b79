//! Live host view: polling plus manual refresh from stdin

use anyhow::Result;
use dashboard_lib::{
    HistoryConfig, HistoryRecord, HostSession, HostView, MetricKind, MonitoringApi, PollerConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use super::host::{render_view, TableOptions};
use crate::output::{print_error, print_info, print_warning};

/// How often the view is checked for changes to redraw
const REDRAW_CHECK: Duration = Duration::from_millis(500);

/// A line typed while watching
#[derive(Debug, PartialEq)]
pub enum WatchInput {
    Quit,
    Refresh(MetricKind),
    Redraw,
    Unknown(String),
}

impl WatchInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim().to_lowercase();
        match line.as_str() {
            "" => WatchInput::Redraw,
            "q" | "quit" | "exit" => WatchInput::Quit,
            other => other
                .parse()
                .map(WatchInput::Refresh)
                .unwrap_or_else(|_| WatchInput::Unknown(other.to_string())),
        }
    }
}

/// What a redraw depends on
#[derive(PartialEq)]
struct Fingerprint {
    records: usize,
    last: Option<HistoryRecord>,
    error: Option<String>,
    triggers: usize,
}

impl From<&HostView> for Fingerprint {
    fn from(view: &HostView) -> Self {
        Self {
            records: view.history.len(),
            last: view.history.last().cloned(),
            error: view.last_error.clone(),
            triggers: view.triggers.len(),
        }
    }
}

fn redraw(view: &HostView, options: &TableOptions) {
    print!("\x1B[2J\x1B[H");
    render_view(view, options);
    println!();
    print_info("Type cpu, memory or disk to refresh a metric; q to quit");
}

/// Watch a host until `q`, Ctrl-C or an unrecoverable stdin error
pub async fn watch_host(
    api: Arc<dyn MonitoringApi>,
    host_id: &str,
    history: HistoryConfig,
    poller: PollerConfig,
    options: &TableOptions,
) -> Result<()> {
    let session = Arc::new(HostSession::new(api, host_id, history));
    if let Err(e) = session.load().await {
        if let Some(message) = session.snapshot().last_error {
            print_error(&message);
        }
        return Err(e.into());
    }

    let view = session.snapshot();
    redraw(&view, options);
    let mut shown = Fingerprint::from(&view);

    let handle = session.start_polling(poller);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut check = tokio::time::interval(REDRAW_CHECK);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!("stdin closed, manual refresh disabled");
                        stdin_open = false;
                        continue;
                    }
                    Err(e) => {
                        debug!(error = %e, "stdin read failed, manual refresh disabled");
                        stdin_open = false;
                        continue;
                    }
                };

                match WatchInput::parse(&line) {
                    WatchInput::Quit => break,
                    WatchInput::Redraw => {
                        let view = session.snapshot();
                        redraw(&view, options);
                        shown = Fingerprint::from(&view);
                    }
                    WatchInput::Refresh(kind) => {
                        let session = session.clone();
                        tokio::spawn(async move {
                            if let Err(e) = session.refresh_metric(kind).await {
                                debug!(metric = %kind, error = %e, "Manual refresh failed");
                            }
                        });
                    }
                    WatchInput::Unknown(other) => {
                        print_warning(&format!("Unknown command: {}", other));
                    }
                }
            }
            _ = check.tick() => {
                let view = session.snapshot();
                let current = Fingerprint::from(&view);
                if current != shown {
                    redraw(&view, options);
                    shown = current;
                }
            }
        }
    }

    handle.cancel();
    session.close();
    print_info(&format!("Stopped watching host {}", host_id));
    Ok(())
}
