//! Audit log listing.

use super::HandlerContext;
use crate::error::GatewayError;
use crate::Result;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use clinicbridge_core::DeliveryRecord;
use serde::Deserialize;

/// Query parameters for `GET /messages`.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    /// Return at most this many records.
    pub limit: Option<usize>,
}

/// `GET /messages`. Records are returned newest first.
pub async fn list_messages(
    State(ctx): State<HandlerContext>,
    query: std::result::Result<Query<MessagesQuery>, QueryRejection>,
) -> Result<Json<Vec<DeliveryRecord>>> {
    let Query(query) = query.map_err(|e| GatewayError::BadRequest(e.body_text()))?;

    let mut records = ctx.coordinator.audit().list().await?;
    if let Some(limit) = query.limit {
        records.truncate(limit);
    }
    Ok(Json(records))
}
