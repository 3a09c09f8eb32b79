//! Proxy configuration

use anyhow::{bail, Context, Result};
use dashboard_lib::ZabbixConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Proxy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Zabbix JSON-RPC endpoint (`ZABBIX_API_URL`)
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default = "default_api_user")]
    pub api_user: String,

    #[serde(default)]
    pub api_password: String,

    /// Upstream request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Listen port (`PORT`)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_api_user() -> String {
    "Admin".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_port() -> u16 {
    9000
}

impl ProxyConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::load_from(None, std::env::var("PORT").ok())
    }

    /// Load from an explicit `ZABBIX_*` variable map instead of the environment
    pub fn load_from(env: Option<HashMap<String, String>>, port: Option<String>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ZABBIX").source(env))
            .set_override_option("port", port)?
            .build()
            .context("failed to read proxy configuration")?;

        let config: ProxyConfig = config
            .try_deserialize()
            .context("invalid proxy configuration")?;

        match config.api_url.as_deref().map(str::trim) {
            None | Some("") => bail!("ZABBIX_API_URL must be set"),
            Some(_) => Ok(config),
        }
    }

    /// Settings for the upstream client
    pub fn zabbix(&self) -> ZabbixConfig {
        ZabbixConfig {
            endpoint: self.api_url.clone().unwrap_or_default(),
            username: self.api_user.clone(),
            password: self.api_password.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_applied() {
        let config = ProxyConfig::load_from(
            env(&[("ZABBIX_API_URL", "http://zabbix.local/api_jsonrpc.php")]),
            None,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.api_user, "Admin");
        assert_eq!(config.zabbix().request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_full_environment() {
        let config = ProxyConfig::load_from(
            env(&[
                ("ZABBIX_API_URL", "http://zabbix.local/api_jsonrpc.php"),
                ("ZABBIX_API_USER", "monitor"),
                ("ZABBIX_API_PASSWORD", "s3cret"),
                ("ZABBIX_REQUEST_TIMEOUT_SECS", "5"),
            ]),
            Some("8088".to_string()),
        )
        .unwrap();

        assert_eq!(config.port, 8088);
        let zabbix = config.zabbix();
        assert_eq!(zabbix.endpoint, "http://zabbix.local/api_jsonrpc.php");
        assert_eq!(zabbix.username, "monitor");
        assert_eq!(zabbix.password, "s3cret");
        assert_eq!(zabbix.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_url_is_an_error() {
        let err = ProxyConfig::load_from(env(&[]), None).unwrap_err();
        assert!(err.to_string().contains("ZABBIX_API_URL"));
    }
}
