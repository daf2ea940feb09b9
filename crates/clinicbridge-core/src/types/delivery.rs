//! Delivery audit record types.

use super::NotificationKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// One immutable audit entry per send attempt that reached the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Unique record ID.
    pub id: String,

    /// Notification kind.
    pub kind: NotificationKind,

    /// Recipient phone number as supplied by the caller.
    pub phone: String,

    /// Normalized transport address the message was sent to.
    pub recipient: String,

    /// Snapshot of the fields that were rendered into the message.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    /// When the attempt completed.
    pub sent_at: DateTime<Utc>,

    /// Attempt outcome.
    pub status: DeliveryStatus,

    /// Transport error text. Present iff `status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DeliveryRecord {
    /// Record a successful send.
    pub fn sent(
        kind: NotificationKind,
        phone: impl Into<String>,
        recipient: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: crate::id::uuid(),
            kind,
            phone: phone.into(),
            recipient: recipient.into(),
            fields,
            sent_at: Utc::now(),
            status: DeliveryStatus::Sent,
            error_message: None,
        }
    }

    /// Record a failed send with the transport's error text.
    pub fn failed(
        kind: NotificationKind,
        phone: impl Into<String>,
        recipient: impl Into<String>,
        fields: BTreeMap<String, String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: DeliveryStatus::Failed,
            error_message: Some(error.into()),
            ..Self::sent(kind, phone, recipient, fields)
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == DeliveryStatus::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_present_iff_failed() {
        let sent = DeliveryRecord::sent(
            NotificationKind::Booking,
            "0791234567",
            "962791234567@c.us",
            BTreeMap::new(),
        );
        assert!(sent.is_sent());
        assert!(sent.error_message.is_none());

        let failed = DeliveryRecord::failed(
            NotificationKind::Payment,
            "0791234567",
            "962791234567@c.us",
            BTreeMap::new(),
            "socket closed",
        );
        assert_eq!(failed.status, DeliveryStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("socket closed"));
        assert_ne!(sent.id, failed.id);
    }

    #[test]
    fn test_sent_record_omits_error_field() {
        let sent = DeliveryRecord::sent(
            NotificationKind::Booking,
            "0791234567",
            "962791234567@c.us",
            BTreeMap::from([("patient_name".to_string(), "Ali".to_string())]),
        );
        let json = serde_json::to_value(&sent).unwrap();
        assert_eq!(json["status"], "sent");
        assert_eq!(json["kind"], "booking");
        assert_eq!(json["fields"]["patient_name"], "Ali");
        assert!(json.get("error_message").is_none());
    }
}
