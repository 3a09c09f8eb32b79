//! Zabbix Dashboard CLI
//!
//! A terminal dashboard for Zabbix hosts: host overview, host detail with a
//! resource chart, live watch mode and trigger commands. All data comes
//! through the Zabbix proxy.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{host, hosts, trigger, watch};
use dashboard_lib::{HistoryConfig, MetricKind, MonitoringApi, PollerConfig, TriggerStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Zabbix Dashboard CLI
#[derive(Parser)]
#[command(name = "zbx")]
#[command(author, version, about = "Terminal dashboard for Zabbix hosts", long_about = None)]
pub struct Cli {
    /// Proxy URL (can also be set via ZBX_PROXY_URL env var)
    #[arg(long, env = "ZBX_PROXY_URL")]
    pub proxy_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List hosts with trigger, alert and problem counts
    Hosts,

    /// Show the detail view of a host
    Host {
        /// Host ID
        hostid: String,

        #[command(flatten)]
        tables: TableArgs,
    },

    /// Watch a host live, refreshing its chart on an interval
    Watch {
        /// Host ID
        hostid: String,

        /// Poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,

        #[command(flatten)]
        tables: TableArgs,
    },

    /// Show the latest reading of one metric
    Latest {
        /// Host ID
        hostid: String,

        /// Metric (cpu, memory, disk)
        kind: MetricKind,
    },

    /// Trigger commands
    #[command(subcommand)]
    Trigger(TriggerCommands),
}

#[derive(clap::Args)]
pub struct TableArgs {
    /// Table page to show (0-based)
    #[arg(long, default_value_t = 0)]
    pub page: usize,

    /// Rows per table page (5, 10 or 25)
    #[arg(long, value_parser = output::parse_rows_per_page)]
    pub rows_per_page: Option<usize>,
}

#[derive(Subcommand)]
pub enum TriggerCommands {
    /// Create a trigger on a host
    Create {
        /// Host ID
        hostid: String,

        /// Trigger name
        #[arg(long)]
        description: String,

        /// Trigger expression
        #[arg(long)]
        expression: String,

        /// Severity 0-5 (default: 2, warning)
        #[arg(long)]
        priority: Option<u8>,
    },

    /// Enable a trigger
    Enable {
        /// Host ID
        hostid: String,
        /// Trigger ID
        triggerid: String,
    },

    /// Disable a trigger
    Disable {
        /// Host ID
        hostid: String,
        /// Trigger ID
        triggerid: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = config::Config::load()?;
    let history = settings
        .display_offset_minutes
        .map(HistoryConfig::with_offset_minutes)
        .unwrap_or_default();
    let table_options = |args: &TableArgs| host::TableOptions {
        page: args.page,
        rows_per_page: args
            .rows_per_page
            .or(settings.rows_per_page)
            .filter(|rows| output::ROWS_PER_PAGE_OPTIONS.contains(rows))
            .unwrap_or(output::ROWS_PER_PAGE_OPTIONS[0]),
        offset: history.display_offset,
    };

    // Initialize client
    let proxy_url = settings.proxy_url(cli.proxy_url.clone());
    let client = client::ProxyClient::new(&proxy_url)?;
    debug!(proxy = %client.base_url(), "Using proxy");
    let api: Arc<dyn MonitoringApi> = Arc::new(client);

    // Execute command
    match cli.command {
        Commands::Hosts => {
            hosts::list_hosts(api, cli.format).await?;
        }
        Commands::Host { hostid, tables } => {
            let options = table_options(&tables);
            host::show_host(api, &hostid, history.clone(), &options, cli.format).await?;
        }
        Commands::Watch {
            hostid,
            interval,
            tables,
        } => {
            let options = table_options(&tables);
            let poller = match interval.or(settings.poll_interval_secs) {
                Some(secs) => PollerConfig::with_interval(Duration::from_secs(secs)),
                None => PollerConfig::default(),
            };
            watch::watch_host(api, &hostid, history.clone(), poller, &options).await?;
        }
        Commands::Latest { hostid, kind } => {
            host::show_latest(api, &hostid, kind, history.display_offset, cli.format).await?;
        }
        Commands::Trigger(trigger_cmd) => match trigger_cmd {
            TriggerCommands::Create {
                hostid,
                description,
                expression,
                priority,
            } => {
                trigger::create_trigger(api, &hostid, &description, &expression, priority, cli.format)
                    .await?;
            }
            TriggerCommands::Enable { hostid, triggerid } => {
                trigger::set_status(api, &hostid, &triggerid, TriggerStatus::Enabled, cli.format)
                    .await?;
            }
            TriggerCommands::Disable { hostid, triggerid } => {
                trigger::set_status(api, &hostid, &triggerid, TriggerStatus::Disabled, cli.format)
                    .await?;
            }
        },
    }

    Ok(())
}
