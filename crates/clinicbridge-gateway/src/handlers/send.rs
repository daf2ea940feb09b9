//! Notification send handlers.
//!
//! Request bodies accept every field as optional so that a missing field is
//! reported by the delivery validation (400) after the readiness gate (503),
//! rather than as a generic body rejection.

use super::HandlerContext;
use crate::error::GatewayError;
use crate::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use clinicbridge_core::{BookingDetails, NotificationRequest, PaymentDetails};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Body of `POST /send-booking`.
#[derive(Debug, Default, Deserialize)]
pub struct SendBookingBody {
    #[serde(default)]
    pub phone: String,
    pub country_code: Option<String>,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub appointment_date: String,
    #[serde(default)]
    pub appointment_time: String,
    pub procedure: Option<String>,
}

impl From<SendBookingBody> for NotificationRequest {
    fn from(body: SendBookingBody) -> Self {
        let request = NotificationRequest::booking(
            body.phone,
            BookingDetails {
                patient_name: body.patient_name,
                appointment_date: body.appointment_date,
                appointment_time: body.appointment_time,
                procedure: body.procedure,
            },
        );
        with_country_code(request, body.country_code)
    }
}

/// Body of `POST /send-payment`.
///
/// Amounts may be sent as JSON numbers or numeric strings.
#[derive(Debug, Default, Deserialize)]
pub struct SendPaymentBody {
    #[serde(default)]
    pub phone: String,
    pub country_code: Option<String>,
    #[serde(default)]
    pub patient_name: String,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub doctor_name: Option<String>,
    pub procedure: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount_paid: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_paid: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub remaining_balance: Option<f64>,
}

impl From<SendPaymentBody> for NotificationRequest {
    fn from(body: SendPaymentBody) -> Self {
        let request = NotificationRequest::payment(
            body.phone,
            PaymentDetails {
                patient_name: body.patient_name,
                appointment_date: body.appointment_date,
                appointment_time: body.appointment_time,
                doctor_name: body.doctor_name,
                procedure: body.procedure,
                total_cost: body.total_cost,
                amount_paid: body.amount_paid,
                total_paid: body.total_paid,
                remaining_balance: body.remaining_balance,
            },
        );
        with_country_code(request, body.country_code)
    }
}

/// Successful send response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    pub success: bool,
    pub message: String,

    /// Audit record ID for this delivery.
    pub id: String,
}

/// `POST /send-booking`.
pub async fn send_booking(
    State(ctx): State<HandlerContext>,
    body: std::result::Result<Json<SendBookingBody>, JsonRejection>,
) -> Result<Json<SendResponse>> {
    let Json(body) = body.map_err(reject)?;
    deliver(&ctx, body.into()).await
}

/// `POST /send-payment`.
pub async fn send_payment(
    State(ctx): State<HandlerContext>,
    body: std::result::Result<Json<SendPaymentBody>, JsonRejection>,
) -> Result<Json<SendResponse>> {
    let Json(body) = body.map_err(reject)?;
    deliver(&ctx, body.into()).await
}

async fn deliver(ctx: &HandlerContext, request: NotificationRequest) -> Result<Json<SendResponse>> {
    debug!(kind = %request.kind(), "notification request received");
    let outcome = ctx.coordinator.deliver(&request).await?;
    Ok(Json(SendResponse {
        success: true,
        message: "Message sent successfully".to_string(),
        id: outcome.record.id,
    }))
}

fn reject(rejection: JsonRejection) -> GatewayError {
    GatewayError::BadRequest(rejection.body_text())
}

fn with_country_code(request: NotificationRequest, code: Option<String>) -> NotificationRequest {
    match code.filter(|c| !c.trim().is_empty()) {
        Some(code) => request.with_country_code(code),
        None => request,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Amount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Amount::Number(value)) => Ok(Some(value)),
        Some(Amount::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Amount::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid amount: {text}"))),
    }
}
