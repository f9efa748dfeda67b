// Error types for offline-vault
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Network failure: {0}")]
    Network(String),

    /// Non-2xx upstream status. Display text doubles as the per-url failure reason.
    #[error("HTTP {0}")]
    Http(u16),

    #[error("Storage failure: {0}")]
    Storage(String),

    /// Malformed control message. Display text is sent verbatim in control replies.
    #[error("{0}")]
    Protocol(String),

    #[error("Control call timed out after {0:?}")]
    CallerTimeout(Duration),

    #[error("Control channel closed")]
    ChannelClosed,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VaultError {
    /// Whether this error came from the upstream side (fetch rejected or non-2xx).
    pub fn is_upstream(&self) -> bool {
        matches!(self, VaultError::Network(_) | VaultError::Http(_))
    }
}

// Convert VaultError to HTTP responses for Axum
impl IntoResponse for VaultError {
    fn into_response(self) -> Response {
        let (status, error_type) = match self {
            VaultError::Network(_) | VaultError::Http(_) => (StatusCode::BAD_GATEWAY, "network_error"),
            VaultError::Protocol(_) | VaultError::InvalidUrl(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            VaultError::CallerTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout_error"),
            VaultError::ChannelClosed => (StatusCode::SERVICE_UNAVAILABLE, "unavailable_error"),
            VaultError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            VaultError::Config(_) | VaultError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "api_error"),
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
