//! Zabbix proxy: HTTP endpoints mirroring the monitoring API

pub mod api;
pub mod config;
