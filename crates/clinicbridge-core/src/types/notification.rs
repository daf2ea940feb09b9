//! Transactional notification request types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of templated notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Appointment booking confirmation.
    Booking,

    /// Payment summary.
    Payment,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Payment => "payment",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields of a booking confirmation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    pub patient_name: String,
    pub appointment_date: String,
    pub appointment_time: String,

    /// Optional procedure line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure: Option<String>,
}

/// Fields of a payment summary. Everything except the patient name is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub patient_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_paid: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_balance: Option<f64>,
}

/// Kind-specific notification body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NotificationDetails {
    Booking(BookingDetails),
    Payment(PaymentDetails),
}

impl NotificationDetails {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Booking(_) => NotificationKind::Booking,
            Self::Payment(_) => NotificationKind::Payment,
        }
    }

    pub fn patient_name(&self) -> &str {
        match self {
            Self::Booking(b) => &b.patient_name,
            Self::Payment(p) => &p.patient_name,
        }
    }
}

/// One notification to deliver. Transient, one per API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Free-form recipient phone number, as supplied by the caller.
    pub phone: String,

    /// Country code override; the deployment default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    #[serde(flatten)]
    pub details: NotificationDetails,
}

impl NotificationRequest {
    /// Create a booking confirmation request.
    pub fn booking(phone: impl Into<String>, details: BookingDetails) -> Self {
        Self {
            phone: phone.into(),
            country_code: None,
            details: NotificationDetails::Booking(details),
        }
    }

    /// Create a payment summary request.
    pub fn payment(phone: impl Into<String>, details: PaymentDetails) -> Self {
        Self {
            phone: phone.into(),
            country_code: None,
            details: NotificationDetails::Payment(details),
        }
    }

    /// Set the country code override.
    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = Some(code.into());
        self
    }

    pub fn kind(&self) -> NotificationKind {
        self.details.kind()
    }

    /// Resolve the effective country code, ignoring blank overrides.
    pub fn country_code_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.country_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(default)
    }
}
