//! Error taxonomy for upstream calls and sample handling

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Errors surfaced by the dashboard library
#[derive(Debug, Error)]
pub enum DashboardError {
    /// A required field was missing or invalid; nothing was sent upstream.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Login against the monitoring API failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection, timeout or HTTP-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The JSON-RPC response carried an error object.
    #[error("Upstream error {code}: {message} {data}")]
    Upstream {
        code: i64,
        message: String,
        data: String,
    },

    /// The response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A history point carried a non-numeric clock or ns field.
    #[error("Malformed sample timestamp: {0:?}")]
    MalformedTimestamp(String),

    /// A history point carried a non-numeric value.
    #[error("Malformed sample value: {0:?}")]
    MalformedValue(String),

    /// The proxy answered with a non-success status.
    #[error("Proxy error ({status}): {message}")]
    Proxy { status: u16, message: String },
}

impl DashboardError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardError::Validation(_) => "validation",
            DashboardError::Auth(_) => "auth",
            DashboardError::Transport(_) => "transport",
            DashboardError::Upstream { .. } => "upstream",
            DashboardError::Decode(_) => "decode",
            DashboardError::MalformedTimestamp(_) => "malformed_timestamp",
            DashboardError::MalformedValue(_) => "malformed_value",
            DashboardError::Proxy { .. } => "proxy",
        }
    }

    /// Whether the caller sent something invalid (as opposed to an upstream failure)
    pub fn is_validation(&self) -> bool {
        matches!(self, DashboardError::Validation(_))
    }

    /// Whether the upstream error means the session token is no longer valid
    pub fn is_session_expired(&self) -> bool {
        match self {
            DashboardError::Upstream { message, data, .. } => {
                let text = format!("{} {}", message, data).to_lowercase();
                text.contains("session terminated")
                    || text.contains("not authorized")
                    || text.contains("not authorised")
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashboardError::Decode(err.to_string())
        } else {
            DashboardError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Decode(err.to_string())
    }
}
