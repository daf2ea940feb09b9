//! Gateway error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clinicbridge_channels::ChannelError;
use clinicbridge_notify::{AuditError, DeliveryError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors that can occur in the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delivery failed or was rejected.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Session operation failed.
    #[error(transparent)]
    Session(#[from] ChannelError),

    /// Audit log could not be read.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Malformed request body or query.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or wrong bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Delivery(DeliveryError::NotConnected(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Delivery(DeliveryError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            Self::Delivery(DeliveryError::Transport(_) | DeliveryError::Persistence(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Session(ChannelError::NotConnected(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Io(_) | Self::Session(_) | Self::Audit(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self, "request failed");
        }

        let body = json!({
            "success": false,
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
