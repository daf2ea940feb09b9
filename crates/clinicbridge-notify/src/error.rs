//! Notification error types.

use clinicbridge_core::SessionState;
use std::path::PathBuf;
use thiserror::Error;

/// A notification request that cannot be rendered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is absent or blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A monetary field is below zero.
    #[error("Field {field} must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: f64 },

    /// A monetary field is NaN or infinite.
    #[error("Field {0} is not a finite number")]
    InvalidAmount(&'static str),
}

/// Audit log storage errors.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit log I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audit log serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors returned by [`DeliveryCoordinator::deliver`](crate::DeliveryCoordinator::deliver).
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The session is not ready. No attempt was made.
    #[error("Chat session not connected (state: {0})")]
    NotConnected(SessionState),

    /// The request is missing or has malformed fields. No attempt was made.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// The transport rejected or failed the send. Recorded as `Failed`.
    #[error("{0}")]
    Transport(String),

    /// The audit log could not be written.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<AuditError> for DeliveryError {
    fn from(e: AuditError) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl DeliveryError {
    /// Whether the caller may retry the same request later.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::NotConnected(_) | Self::Transport(_))
    }
}
