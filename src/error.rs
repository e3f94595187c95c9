//! Error types for the Freshdesk bridge

use serde_json::{json, Value};
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, FreshdeskError>;

/// Error kinds surfaced by the bridge.
///
/// `Config` halts the process at startup. Every other kind is reported to the
/// caller as a structured tool failure and the server keeps running.
#[derive(Debug, Error)]
pub enum FreshdeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
        payload: Option<Value>,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl FreshdeskError {
    /// Build a transport error for a non-success HTTP status
    pub fn status(status: u16, payload: Option<Value>) -> Self {
        Self::Transport {
            status: Some(status),
            message: format!("Freshdesk responded with HTTP {status}"),
            payload,
        }
    }

    /// Build a transport error for a network-level failure
    pub fn network(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
            payload: None,
        }
    }

    /// Whether the process should stop rather than report and continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Short machine-readable kind tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Validation(_) => "validation",
            Self::Transport { .. } => "transport",
            Self::Unexpected(_) => "unexpected",
        }
    }

    /// Structured failure payload returned to tool callers
    pub fn to_payload(&self) -> Value {
        let mut error = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });

        if let Self::Transport {
            status, payload, ..
        } = self
        {
            if let Some(status) = status {
                error["status"] = json!(status);
            }
            if let Some(payload) = payload {
                error["payload"] = payload.clone();
            }
        }

        json!({ "error": error })
    }
}

impl From<serde_json::Error> for FreshdeskError {
    fn from(e: serde_json::Error) -> Self {
        Self::Unexpected(format!("JSON error: {e}"))
    }
}
