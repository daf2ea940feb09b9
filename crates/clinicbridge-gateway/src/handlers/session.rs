//! Session status, pairing and logout handlers.

use super::HandlerContext;
use crate::Result;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use clinicbridge_core::SessionState;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Response of `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Whether notifications can be sent right now.
    pub connected: bool,

    pub state: SessionState,

    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    #[serde(default)]
    pub reconnect_attempts: u32,
}

/// Response of `GET /pairing`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PairingResponse {
    pub state: SessionState,

    /// Code to scan or enter on the phone, while pairing is pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
}

/// Response of `POST /logout`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /status`.
pub async fn status(State(ctx): State<HandlerContext>) -> Json<StatusResponse> {
    let status = ctx.coordinator.session().status();
    Json(StatusResponse {
        connected: status.state.is_ready(),
        state: status.state,
        timestamp: Utc::now(),
        last_error: status.last_error,
        reconnect_attempts: status.reconnect_attempts,
    })
}

/// `GET /pairing`.
pub async fn pairing(State(ctx): State<HandlerContext>) -> Json<PairingResponse> {
    let session = ctx.coordinator.session();
    Json(PairingResponse {
        state: session.current_state(),
        pairing_code: session.pairing_code(),
    })
}

/// `POST /logout`. Ends the session and deletes stored credentials.
pub async fn logout(State(ctx): State<HandlerContext>) -> Result<Json<LogoutResponse>> {
    ctx.coordinator.session().logout().await?;
    info!("session logged out via API");
    Ok(Json(LogoutResponse {
        success: true,
        message: "Logged out".to_string(),
    }))
}
