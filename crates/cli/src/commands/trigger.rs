//! Trigger commands

use anyhow::Result;
use dashboard_lib::{HistoryConfig, HostSession, MonitoringApi, TriggerIds, TriggerStatus};
use std::sync::Arc;

use crate::output::{color_status, print_error, print_json, print_success, OutputFormat};

/// Create a trigger on a host
pub async fn create_trigger(
    api: Arc<dyn MonitoringApi>,
    host_id: &str,
    description: &str,
    expression: &str,
    priority: Option<u8>,
    format: OutputFormat,
) -> Result<()> {
    let session = HostSession::new(api, host_id, HistoryConfig::default());
    let ids = session
        .create_trigger(description, expression, priority)
        .await
        .map_err(|e| report(&session, e))?;

    print_outcome(&session, &ids, "Created trigger", format)
}

/// Enable or disable a trigger
pub async fn set_status(
    api: Arc<dyn MonitoringApi>,
    host_id: &str,
    trigger_id: &str,
    status: TriggerStatus,
    format: OutputFormat,
) -> Result<()> {
    let session = HostSession::new(api, host_id, HistoryConfig::default());
    let ids = session
        .update_trigger_status(trigger_id, status)
        .await
        .map_err(|e| report(&session, e))?;

    let action = format!("Trigger {}", color_status(&status.to_string()));
    print_outcome(&session, &ids, &action, format)
}

fn report(session: &HostSession, err: dashboard_lib::DashboardError) -> anyhow::Error {
    if let Some(message) = session.snapshot().last_error {
        print_error(&message);
    }
    err.into()
}

fn print_outcome(
    session: &HostSession,
    ids: &TriggerIds,
    action: &str,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(ids)?,
        OutputFormat::Table => {
            print_success(&format!("{}: {}", action, ids.triggerids.join(", ")));
            println!(
                "Host {} now has {} active triggers",
                session.host_id(),
                session.snapshot().triggers.len()
            );
        }
    }
    Ok(())
}
