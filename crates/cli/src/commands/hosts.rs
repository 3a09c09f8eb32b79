//! Host overview command

use anyhow::Result;
use colored::Colorize;
use dashboard_lib::{host_overview, MonitoringApi};
use std::sync::Arc;
use tabled::Tabled;

use crate::output::{print_error, print_json, print_warning, OutputFormat};

/// Row for the host overview table
#[derive(Tabled)]
struct HostRow {
    #[tabled(rename = "Host ID")]
    hostid: String,
    #[tabled(rename = "Host Name")]
    name: String,
    #[tabled(rename = "Triggers")]
    triggers: usize,
    #[tabled(rename = "Alerts")]
    alerts: String,
    #[tabled(rename = "Problems")]
    problems: String,
}

/// List every host with its trigger, alert and problem counts
pub async fn list_hosts(api: Arc<dyn MonitoringApi>, format: OutputFormat) -> Result<()> {
    let summaries = match host_overview(api).await {
        Ok(summaries) => summaries,
        Err(e) => {
            print_error(dashboard_lib::overview::OVERVIEW_FAILURE);
            return Err(e.into());
        }
    };

    match format {
        OutputFormat::Json => print_json(&summaries)?,
        OutputFormat::Table => {
            if summaries.is_empty() {
                print_warning("No hosts available");
                return Ok(());
            }

            let rows: Vec<HostRow> = summaries
                .iter()
                .map(|s| HostRow {
                    hostid: s.host.hostid.clone(),
                    name: s.host.name.clone(),
                    triggers: s.trigger_count,
                    alerts: highlight_count(s.alert_count),
                    problems: highlight_count(s.problem_count),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} hosts", summaries.len());
        }
    }

    Ok(())
}

fn highlight_count(count: usize) -> String {
    if count > 0 {
        count.to_string().red().bold().to_string()
    } else {
        count.to_string()
    }
}
