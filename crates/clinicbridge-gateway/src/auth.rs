//! Bearer token authentication.

use crate::error::GatewayError;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use clinicbridge_core::SecretString;
use std::sync::Arc;
use tracing::warn;

/// Reject requests whose `Authorization: Bearer` token does not match.
pub async fn require_bearer(
    State(expected): State<Arc<SecretString>>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(token) if expected.matches(token) => Ok(next.run(request).await),
        Some(_) => {
            warn!(path = %request.uri().path(), "rejected request with invalid token");
            Err(GatewayError::Unauthorized("invalid token".to_string()))
        }
        None => Err(GatewayError::Unauthorized(
            "missing bearer token".to_string(),
        )),
    }
}
