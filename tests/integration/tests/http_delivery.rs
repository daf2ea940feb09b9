//! Notification delivery through the HTTP API.

use axum::http::StatusCode;
use clinicbridge_core::DeliveryRecord;
use clinicbridge_integration_tests::{ali_booking, Harness, Start};
use clinicbridge_notify::AuditLog;
use serde_json::json;

#[tokio::test]
async fn test_booking_is_sent_and_recorded() {
    let h = Harness::connected().await;

    let (status, body) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Message sent successfully");
    let id = body["id"].as_str().unwrap().to_string();

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "962791234567@c.us");
    for needle in ["Ali", "2024-01-01", "10:00"] {
        assert!(sent[0].body.contains(needle), "body is missing {needle}");
    }

    let (status, messages) = h.get("/messages").await;
    assert_eq!(status, StatusCode::OK);
    let records: Vec<DeliveryRecord> = serde_json::from_value(messages).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert!(records[0].is_sent());
    assert_eq!(records[0].recipient, "962791234567@c.us");
    assert_eq!(records[0].fields["patient_name"], "Ali");
    assert_eq!(records[0].fields["appointment_date"], "2024-01-01");
    assert_eq!(records[0].fields["appointment_time"], "10:00");

    h.shutdown().await;
}

#[tokio::test]
async fn test_missing_name_is_rejected_without_audit() {
    let h = Harness::connected().await;

    let mut request = ali_booking();
    request["patient_name"] = json!("");
    let (status, body) = h.post("/send-booking", request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("patient_name"));
    assert!(h.transport.sent().is_empty());
    assert!(h.audit.is_empty().await.unwrap());

    h.shutdown().await;
}

#[tokio::test]
async fn test_missing_fields_are_bad_request() {
    let h = Harness::connected().await;

    let (status, _) = h.post("/send-booking", json!({ "phone": "0791234567" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h.post("/send-payment", json!({ "patient_name": "Sara" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(h.audit.is_empty().await.unwrap());
    h.shutdown().await;
}

#[tokio::test]
async fn test_payment_paid_in_full() {
    let h = Harness::connected().await;

    let (status, body) = h
        .post(
            "/send-payment",
            json!({
                "phone": "0501234567",
                "patient_name": "Sara",
                "total_cost": 100,
                "amount_paid": 100,
                "remaining_balance": 0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let sent = h.transport.sent();
    assert_eq!(sent[0].recipient, "966501234567@c.us");
    assert!(sent[0].body.contains("paid in full"));
    assert!(!sent[0].body.contains("Remaining balance"));

    h.shutdown().await;
}

#[tokio::test]
async fn test_payment_with_balance_and_string_amounts() {
    let h = Harness::connected().await;

    let (status, _) = h
        .post(
            "/send-payment",
            json!({
                "phone": "0501234567",
                "patient_name": "Sara",
                "doctor_name": "Dr. Hana",
                "total_cost": "300",
                "total_paid": "120.5",
                "remaining_balance": "179.5"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let body = &h.transport.sent()[0].body;
    assert!(body.contains("Remaining balance: 179.50 SAR"));
    assert!(body.contains("Dr. Hana"));
    assert!(!body.contains("paid in full"));

    h.shutdown().await;
}

#[tokio::test]
async fn test_not_connected_is_service_unavailable() {
    let h = Harness::start(Start::Idle, None).await;

    let (status, body) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert!(h.audit.is_empty().await.unwrap());

    // Readiness is checked before validation.
    let (status, _) = h.post("/send-payment", json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_transport_failure_is_recorded() {
    let h = Harness::connected().await;
    h.transport.fail_next_send("recipient is not on the network");

    let (status, body) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "recipient is not on the network");

    let records = h.audit.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].is_sent());
    assert_eq!(
        records[0].error_message.as_deref(),
        Some("recipient is not on the network")
    );

    // The session stays usable.
    let (status, _) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.audit.len().await.unwrap(), 2);

    h.shutdown().await;
}

#[tokio::test]
async fn test_messages_newest_first_with_limit() {
    let h = Harness::connected().await;

    for name in ["Ali", "Omar", "Lina"] {
        let mut request = ali_booking();
        request["patient_name"] = json!(name);
        let (status, _) = h.post("/send-booking", request).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, messages) = h.get("/messages").await;
    let names: Vec<&str> = messages
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["fields"]["patient_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Lina", "Omar", "Ali"]);

    let (_, limited) = h.get("/messages?limit=2").await;
    assert_eq!(limited.as_array().unwrap().len(), 2);

    let (status, _) = h.get("/messages?limit=many").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    h.shutdown().await;
}

#[tokio::test]
async fn test_audit_log_is_persisted() {
    let h = Harness::connected().await;
    let (status, _) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(status, StatusCode::OK);

    let reopened = AuditLog::json_file(&h.audit_path, 200);
    let records = reopened.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].phone, "0791234567");

    h.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_deliveries_are_all_recorded() {
    let h = Harness::connected().await;

    let requests = (0..10).map(|n| {
        let mut request = ali_booking();
        request["patient_name"] = json!(format!("Patient {n}"));
        h.post("/send-booking", request)
    });
    let results = futures::future::join_all(requests).await;
    assert!(results.iter().all(|(status, _)| *status == StatusCode::OK));

    assert_eq!(h.audit.len().await.unwrap(), 10);
    assert_eq!(h.transport.sent().len(), 10);

    h.shutdown().await;
}
