//! Trigger commands and their local validation
//!
//! Every check here runs before anything is sent upstream.

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};

/// Severity used when a trigger is created without one ("warning")
pub const DEFAULT_PRIORITY: u8 = 2;

/// Highest Zabbix severity ("disaster")
pub const MAX_PRIORITY: u8 = 5;

/// A trigger to be created on a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDraft {
    pub host_id: String,
    pub description: String,
    pub expression: String,
    pub priority: u8,
}

impl TriggerDraft {
    /// Build a draft; `priority` falls back to [`DEFAULT_PRIORITY`]
    pub fn new(
        host_id: impl Into<String>,
        description: impl Into<String>,
        expression: impl Into<String>,
        priority: Option<u8>,
    ) -> Self {
        Self {
            host_id: host_id.into(),
            description: description.into(),
            expression: expression.into(),
            priority: priority.unwrap_or(DEFAULT_PRIORITY),
        }
    }

    /// Reject drafts with missing fields or an out-of-range priority
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.host_id.trim().is_empty() {
            missing.push("hostid");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.expression.trim().is_empty() {
            missing.push("expression");
        }

        if !missing.is_empty() {
            return Err(DashboardError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        if self.priority > MAX_PRIORITY {
            return Err(DashboardError::Validation(format!(
                "priority must be between 0 and {}, got {}",
                MAX_PRIORITY, self.priority
            )));
        }

        Ok(())
    }
}

/// Reject an empty trigger id
pub fn validate_trigger_id(trigger_id: &str) -> Result<()> {
    if trigger_id.trim().is_empty() {
        return Err(DashboardError::Validation(
            "Missing required field: triggerid".to_string(),
        ));
    }
    Ok(())
}

/// Reject an empty host id
pub fn validate_host_id(host_id: &str) -> Result<()> {
    if host_id.trim().is_empty() {
        return Err(DashboardError::Validation(
            "Missing required field: hostid".to_string(),
        ));
    }
    Ok(())
}
