//! Channel error types.

use clinicbridge_core::SessionState;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during session and transport operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The session is not in the `Connected` state.
    #[error("Session not connected (state: {0})")]
    NotConnected(SessionState),

    /// The underlying transport failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A transport call did not complete in time.
    #[error("Transport call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Credential storage failed.
    #[error("Credential store error: {0}")]
    Persistence(String),

    /// Transport configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChannelError {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Whether the send was rejected before reaching the transport.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected(_))
    }
}
