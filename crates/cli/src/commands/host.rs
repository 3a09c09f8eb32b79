//! Host detail commands

use anyhow::Result;
use chrono::{FixedOffset, Utc};
use colored::Colorize;
use dashboard_lib::{
    Alert, HistoryConfig, HistoryRecord, HostSession, HostView, Item, MetricKind, MetricSample,
    MonitoringApi, Problem, Trigger,
};
use serde::Serialize;
use std::sync::Arc;
use tabled::Tabled;

use crate::output::{
    color_priority, color_status, format_unix, format_uptime_value, format_value, print_error,
    print_json, print_paged_table, print_warning, render_chart, OutputFormat,
};

/// Pagination and time display for the host tables
#[derive(Debug, Clone)]
pub struct TableOptions {
    pub page: usize,
    pub rows_per_page: usize,
    pub offset: FixedOffset,
}

#[derive(Tabled)]
struct CpuRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Last Value")]
    last_value: String,
}

#[derive(Tabled)]
struct UptimeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
}

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Last Change")]
    last_change: String,
}

#[derive(Tabled)]
struct TriggerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Expression")]
    expression: String,
    #[tabled(rename = "Last Change")]
    last_change: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct ProblemRow {
    #[tabled(rename = "Event ID")]
    eventid: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Acknowledged")]
    acknowledged: String,
}

/// JSON shape of the host detail
#[derive(Serialize)]
pub struct HostReport<'a> {
    pub hostid: &'a str,
    pub name: &'a str,
    pub uptime_secs: Option<u64>,
    pub history: Vec<&'a HistoryRecord>,
    pub cpu_load: &'a [Item],
    pub uptime: &'a [Item],
    pub alerts: &'a [Alert],
    pub active_triggers: &'a [Trigger],
    pub problems: &'a [Problem],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> From<&'a HostView> for HostReport<'a> {
    fn from(view: &'a HostView) -> Self {
        Self {
            hostid: &view.host_id,
            name: &view.host_name,
            uptime_secs: view.uptime_secs(),
            history: view.history.records().collect(),
            cpu_load: &view.cpu_items,
            uptime: &view.uptime_items,
            alerts: &view.alerts,
            active_triggers: &view.triggers,
            problems: &view.problems,
            error: view.last_error.as_deref(),
        }
    }
}

/// Load a host once and print its detail view
pub async fn show_host(
    api: Arc<dyn MonitoringApi>,
    host_id: &str,
    history: HistoryConfig,
    options: &TableOptions,
    format: OutputFormat,
) -> Result<()> {
    let session = HostSession::new(api, host_id, history);
    if let Err(e) = session.load().await {
        if let Some(message) = session.snapshot().last_error {
            print_error(&message);
        }
        return Err(e.into());
    }

    let view = session.snapshot();
    match format {
        OutputFormat::Json => print_json(&HostReport::from(&view))?,
        OutputFormat::Table => render_view(&view, options),
    }
    Ok(())
}

/// Print the whole host-detail view
pub fn render_view(view: &HostView, options: &TableOptions) {
    println!(
        "{}",
        format!("Host: {} (ID: {})", view.host_name, view.host_id).bold()
    );
    if let Some(message) = &view.last_error {
        print_error(message);
    }

    println!("\n{}", "Resource Utilization".bold());
    let chart = view.history.chart();
    if chart.is_empty() {
        print_warning(
            "No resource utilization data available. Please wait for data or fetch manually.",
        );
    } else {
        println!("{}", render_chart(&chart));
    }

    let (page, rows) = (options.page, options.rows_per_page);
    let offset = options.offset;

    print_paged_table("CPU Load", &view.cpu_items, page, rows, "No CPU data available", |item| {
        CpuRow {
            name: item.name.clone(),
            last_value: item.lastvalue.clone(),
        }
    });

    print_paged_table("Uptime", &view.uptime_items, page, rows, "No uptime data available", |item| {
        UptimeRow {
            name: item.name.clone(),
            uptime: format_uptime_value(&item.lastvalue),
        }
    });

    print_paged_table("Alerts", &view.alerts, page, rows, "No alerts available", |alert| {
        AlertRow {
            description: alert.description.clone(),
            priority: color_priority(&alert.priority),
            last_change: format_unix(&alert.lastchange, offset),
        }
    });

    print_paged_table(
        "Active Triggers",
        &view.triggers,
        page,
        rows,
        "No active triggers available",
        |trigger| TriggerRow {
            id: trigger.triggerid.clone(),
            description: trigger.description.clone(),
            priority: color_priority(&trigger.priority),
            expression: trigger.expression.clone(),
            last_change: format_unix(&trigger.lastchange, offset),
            status: color_status(trigger.status.as_deref().unwrap_or("-")),
        },
    );

    print_paged_table("Problems", &view.problems, page, rows, "No problems available", |problem| {
        ProblemRow {
            eventid: problem.eventid.clone(),
            name: problem.name.clone(),
            severity: color_priority(&problem.severity),
            time: format_unix(&problem.clock, offset),
            acknowledged: if problem.is_acknowledged() { "Yes" } else { "No" }.to_string(),
        }
    });
}

/// Print the latest reading of one metric
pub async fn show_latest(
    api: Arc<dyn MonitoringApi>,
    host_id: &str,
    kind: MetricKind,
    offset: FixedOffset,
    format: OutputFormat,
) -> Result<()> {
    let points = api.latest_samples(host_id, kind).await?;
    let sample = MetricSample::from_points(kind, &points, Utc::now())?;

    match format {
        OutputFormat::Json => print_json(&sample)?,
        OutputFormat::Table => match sample.value {
            Some(_) => println!(
                "{}: {} (at {})",
                kind.label().bold(),
                format_value(sample.value),
                sample.observed_at.with_timezone(&offset).format("%Y-%m-%d %H:%M:%S")
            ),
            None => print_warning(&format!("No {} data available", kind.display_name())),
        },
    }
    Ok(())
}
