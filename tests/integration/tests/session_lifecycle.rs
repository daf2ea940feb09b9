//! Session pairing, reconnect and logout as seen through the HTTP API.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use clinicbridge_channels::DisconnectReason;
use clinicbridge_core::SessionState;
use clinicbridge_integration_tests::{ali_booking, Harness, Start, RECONNECT_DELAY};

#[tokio::test]
async fn test_pairing_flow() {
    let h = Harness::start(Start::AwaitingPairing, None).await;

    let (_, status) = h.get("/status").await;
    assert_eq!(status["connected"], false);
    assert_eq!(status["state"], "awaiting_pairing");

    let (_, pairing) = h.get("/pairing").await;
    assert_eq!(pairing["pairing_code"], "LOOPBACK-PAIRING-CODE");

    let (code, _) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);

    h.transport.complete_pairing();
    h.wait_for_state(SessionState::Connected).await;

    let (_, status) = h.get("/status").await;
    assert_eq!(status["connected"], true);
    let (_, pairing) = h.get("/pairing").await;
    assert!(pairing.get("pairing_code").is_none());

    // Credentials are persisted once the transport issues them.
    let mut persisted = false;
    for _ in 0..50 {
        if h.credentials_path.exists() {
            persisted = true;
            break;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
    assert!(persisted, "credentials were not written");

    let (code, _) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(code, StatusCode::OK);

    h.shutdown().await;
}

#[tokio::test]
async fn test_connection_loss_reconnects() {
    let h = Harness::connected().await;
    let attempts_before = h.transport.connect_attempts();

    h.transport.disconnect(DisconnectReason::ConnectionLost("socket reset".into()));
    h.wait_for_state(SessionState::Reconnecting).await;
    h.wait_for_state(SessionState::Connected).await;

    assert!(h.transport.connect_attempts() > attempts_before);
    let (code, _) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(code, StatusCode::OK);

    h.shutdown().await;
}

#[tokio::test]
async fn test_sends_fail_fast_while_reconnecting() {
    let h = Harness::connected().await;

    h.transport.fail_connects(u32::MAX);
    h.transport.drop_connection();
    h.wait_for_state(SessionState::Reconnecting).await;

    let (code, body) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert!(h.audit.is_empty().await.unwrap());

    let (_, status) = h.get("/status").await;
    assert_eq!(status["connected"], false);

    h.transport.fail_connects(0);
    h.wait_for_state(SessionState::Connected).await;

    let (code, _) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(code, StatusCode::OK);

    h.shutdown().await;
}

#[tokio::test]
async fn test_remote_logout_is_terminal() {
    let h = Harness::connected().await;
    assert!(h.credentials_path.exists());

    h.transport.disconnect(DisconnectReason::LoggedOut);
    h.wait_for_state(SessionState::LoggedOut).await;
    let attempts = h.transport.connect_attempts();

    tokio::time::sleep(RECONNECT_DELAY * 10).await;
    assert_eq!(h.transport.connect_attempts(), attempts);
    assert_eq!(h.session.current_state(), SessionState::LoggedOut);
    assert!(!h.credentials_path.exists());

    let (code, _) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);

    h.shutdown().await;
}

#[tokio::test]
async fn test_logout_endpoint() {
    let h = Harness::connected().await;

    let (code, body) = h.post("/logout", serde_json::json!({})).await;
    assert_eq!(code, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);

    assert!(h.transport.logged_out());
    assert_eq!(h.session.current_state(), SessionState::LoggedOut);
    assert!(!h.credentials_path.exists());

    let (_, status) = h.get("/status").await;
    assert_eq!(status["state"], "logged_out");

    h.shutdown().await;
}

#[tokio::test]
async fn test_bearer_token_guards_api() {
    let h = Harness::start(Start::Connected, Some("clinic-token")).await;

    // The harness sends the token on every request.
    let (code, _) = h.post("/send-booking", ali_booking()).await;
    assert_eq!(code, StatusCode::OK);

    let anonymous = |uri: &str| Request::get(uri).body(Body::empty()).unwrap();
    let (code, body) = h.send(anonymous("/messages")).await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (code, _) = h.send(anonymous("/health")).await;
    assert_eq!(code, StatusCode::OK);

    let wrong = Request::get("/status")
        .header("authorization", "Bearer not-the-token")
        .body(Body::empty())
        .unwrap();
    let (code, _) = h.send(wrong).await;
    assert_eq!(code, StatusCode::UNAUTHORIZED);

    h.shutdown().await;
}
