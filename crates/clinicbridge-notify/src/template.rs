//! Message templates for transactional notifications.
//!
//! Every message has the same shape: a greeting with the patient's name, a
//! titled block between two delimiter lines, and a closing courtesy line.
//! Rendering is pure. Requests are validated before any text is produced.

use crate::error::ValidationError;
use clinicbridge_core::{BookingDetails, NotificationDetails, PaymentDetails};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Delimiter between message sections.
pub const DELIMITER: &str = "━━━━━━━━━━━━━━━";

/// Closing courtesy line.
pub const CLOSING_LINE: &str = "Thank you for trusting us 🙏";

/// Emitted instead of a remaining-balance line when nothing is owed.
pub const PAID_IN_FULL_LINE: &str = "✅ Your balance is paid in full";

/// A rendered message body and the field values that went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub body: String,
    pub fields: BTreeMap<String, String>,
}

/// Renders notification bodies.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    currency: String,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new("SAR")
    }
}

impl TemplateEngine {
    /// Create an engine that labels amounts with `currency`.
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn render(
        &self,
        details: &NotificationDetails,
    ) -> Result<RenderedMessage, ValidationError> {
        match details {
            NotificationDetails::Booking(booking) => self.render_booking(booking),
            NotificationDetails::Payment(payment) => self.render_payment(payment),
        }
    }

    /// Appointment confirmation. Name, date and time are required.
    pub fn render_booking(
        &self,
        booking: &BookingDetails,
    ) -> Result<RenderedMessage, ValidationError> {
        let name = required("patient_name", &booking.patient_name)?;
        let date = required("appointment_date", &booking.appointment_date)?;
        let time = required("appointment_time", &booking.appointment_time)?;
        let procedure = optional(booking.procedure.as_deref());

        let mut msg = MessageBuilder::new(name, "📅 *Your appointment details:*");
        msg.line("🗓️ Date", "appointment_date", date);
        msg.line("⏰ Time", "appointment_time", time);
        if let Some(procedure) = procedure {
            msg.line("🦷 Procedure", "procedure", procedure);
        }
        Ok(msg.finish())
    }

    /// Payment summary. Only the patient name is required; every other field
    /// is rendered only when present.
    pub fn render_payment(
        &self,
        payment: &PaymentDetails,
    ) -> Result<RenderedMessage, ValidationError> {
        let name = required("patient_name", &payment.patient_name)?;
        let total_cost = amount("total_cost", payment.total_cost)?;
        let amount_paid = amount("amount_paid", payment.amount_paid)?;
        let total_paid = amount("total_paid", payment.total_paid)?;
        let remaining = amount("remaining_balance", payment.remaining_balance)?;

        let mut msg = MessageBuilder::new(name, "💰 *Your payment summary:*");
        if let Some(date) = optional(payment.appointment_date.as_deref()) {
            msg.line("🗓️ Date", "appointment_date", date);
        }
        if let Some(time) = optional(payment.appointment_time.as_deref()) {
            msg.line("⏰ Time", "appointment_time", time);
        }
        if let Some(doctor) = optional(payment.doctor_name.as_deref()) {
            msg.line("👨‍⚕️ Doctor", "doctor_name", doctor);
        }
        if let Some(procedure) = optional(payment.procedure.as_deref()) {
            msg.line("🦷 Procedure", "procedure", procedure);
        }

        if let Some(value) = positive(total_cost) {
            msg.line("📊 Total cost", "total_cost", &self.money(value));
        }
        if let Some(value) = positive(amount_paid) {
            msg.line("✅ Amount paid", "amount_paid", &self.money(value));
        }
        if let Some(value) = positive(total_paid) {
            msg.line("💵 Total paid", "total_paid", &self.money(value));
        }
        match positive(remaining) {
            Some(value) => {
                msg.line("⚠️ Remaining balance", "remaining_balance", &self.money(value))
            }
            None => msg.raw_line(PAID_IN_FULL_LINE),
        }

        Ok(msg.finish())
    }

    fn money(&self, value: f64) -> String {
        if self.currency.is_empty() {
            format!("{:.2}", value)
        } else {
            format!("{:.2} {}", value, self.currency)
        }
    }
}

struct MessageBuilder {
    body: String,
    fields: BTreeMap<String, String>,
}

impl MessageBuilder {
    fn new(name: &str, title: &str) -> Self {
        let mut body = String::new();
        let _ = write!(body, "Hello {} 👋\n\n{}\n{}\n", name, title, DELIMITER);

        let mut fields = BTreeMap::new();
        fields.insert("patient_name".to_string(), name.to_string());
        Self { body, fields }
    }

    fn line(&mut self, label: &str, key: &str, value: &str) {
        let _ = writeln!(self.body, "{}: {}", label, value);
        self.fields.insert(key.to_string(), value.to_string());
    }

    fn raw_line(&mut self, text: &str) {
        self.body.push_str(text);
        self.body.push('\n');
    }

    fn finish(mut self) -> RenderedMessage {
        self.body.push_str(DELIMITER);
        self.body.push('\n');
        self.body.push_str(CLOSING_LINE);
        RenderedMessage {
            body: self.body,
            fields: self.fields,
        }
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(value)
    }
}

fn optional(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn amount(field: &'static str, value: Option<f64>) -> Result<Option<f64>, ValidationError> {
    match value {
        Some(v) if !v.is_finite() => Err(ValidationError::InvalidAmount(field)),
        Some(v) if v < 0.0 => Err(ValidationError::NegativeAmount { field, value: v }),
        other => Ok(other),
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}
