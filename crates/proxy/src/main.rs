//! Zabbix proxy
//!
//! Serves the dashboard's JSON endpoints and forwards each call to the
//! Zabbix JSON-RPC API with the configured service credentials.

use anyhow::{Context, Result};
use dashboard_lib::{
    observability::{DashboardMetrics, StructuredLogger},
    ZabbixClient,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zabbix_proxy::{api, config::ProxyConfig};

const PROXY_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting zabbix-proxy");

    let config = ProxyConfig::load()?;
    let client = ZabbixClient::new(config.zabbix()).context("failed to create Zabbix client")?;
    info!(endpoint = %client.endpoint(), port = config.port, "Proxy configured");

    // Register metrics before the first scrape
    let _metrics = DashboardMetrics::new();

    let logger = StructuredLogger::new("proxy");
    logger.log_startup(PROXY_VERSION, &format!("0.0.0.0:{}", config.port));

    let app_state = Arc::new(api::AppState::new(Arc::new(client)));
    let mut api_handle = tokio::spawn(api::serve(config.port, app_state));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
        served = &mut api_handle => {
            let reason = match served {
                Ok(Ok(())) => "server exited".to_string(),
                Ok(Err(e)) => format!("server failed: {:#}", e),
                Err(e) => format!("server task failed: {}", e),
            };
            error!(reason = %reason, "Proxy server stopped");
            logger.log_shutdown(&reason);
            anyhow::bail!(reason);
        }
    }

    info!("Shutting down");
    Ok(())
}
