//! Shared harness for the integration tests.
//!
//! A [`Harness`] wires the real stack together: loopback transport, file
//! credential store and JSON audit log in a temporary directory, session
//! manager, delivery coordinator and the gateway router.

use axum::body::{to_bytes, Body};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::Router;
use clinicbridge_channels::{
    CredentialStore, Credentials, FileCredentialStore, LoopbackTransport, ReconnectPolicy,
    SessionManager,
};
use clinicbridge_core::config::GatewayConfig;
use clinicbridge_core::{SecretString, SessionState};
use clinicbridge_gateway::Gateway;
use clinicbridge_notify::{AuditLog, DeliveryCoordinator, TemplateEngine};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// Upper bound for any state wait in the tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Delay between reconnect attempts in the tests.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(20);

/// How the harness session starts out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    /// Stored credentials, session started and connected.
    Connected,
    /// No credentials, transport asks for pairing.
    AwaitingPairing,
    /// Session never started.
    Idle,
}

pub struct Harness {
    pub transport: Arc<LoopbackTransport>,
    pub session: Arc<SessionManager>,
    pub audit: Arc<AuditLog>,
    pub router: Router,
    pub credentials_path: PathBuf,
    pub audit_path: PathBuf,
    token: Option<String>,
    _dir: TempDir,
}

impl Harness {
    pub async fn connected() -> Self {
        Self::start(Start::Connected, None).await
    }

    pub async fn start(start: Start, auth_token: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        let credentials_path = dir.path().join("session").join("credentials.json");
        let audit_path = dir.path().join("audit").join("messages.json");

        let transport = match start {
            Start::AwaitingPairing => Arc::new(LoopbackTransport::new().requiring_pairing()),
            _ => Arc::new(LoopbackTransport::new()),
        };

        let store = Arc::new(FileCredentialStore::new(&credentials_path));
        if start == Start::Connected {
            store
                .save(&Credentials::new(b"paired-earlier".to_vec()))
                .await
                .unwrap();
        }

        let session = Arc::new(
            SessionManager::new(transport.clone(), store)
                .with_reconnect_policy(ReconnectPolicy::fixed(RECONNECT_DELAY))
                .with_send_timeout(Duration::from_secs(2)),
        );
        let audit = Arc::new(AuditLog::json_file(&audit_path, 200));
        let coordinator = Arc::new(DeliveryCoordinator::new(
            session.clone(),
            audit.clone(),
            TemplateEngine::default(),
            "966",
        ));

        let config = GatewayConfig {
            auth_token: auth_token.map(SecretString::new),
            ..Default::default()
        };
        let router = Gateway::new(config, coordinator).router();

        match start {
            Start::Connected => {
                session.start();
                session
                    .wait_for(SessionState::is_ready, WAIT)
                    .await
                    .expect("session did not connect");
            }
            Start::AwaitingPairing => {
                session.start();
                session
                    .wait_for(|s| s == SessionState::AwaitingPairing, WAIT)
                    .await
                    .expect("session did not ask for pairing");
            }
            Start::Idle => {}
        }

        Self {
            transport,
            session,
            audit,
            router,
            credentials_path,
            audit_path,
            token: auth_token.map(str::to_string),
            _dir: dir,
        }
    }

    /// Wait until the session reaches `state`.
    pub async fn wait_for_state(&self, state: SessionState) {
        let reached = self.session.wait_for(|s| s == state, WAIT).await;
        assert_eq!(reached, Some(state), "session did not reach {state}");
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(self.request("GET", path).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = self
            .request("POST", path)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(path);
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    pub async fn shutdown(self) {
        self.session.shutdown().await;
    }
}

/// Scenario request: booking for Ali in Jordan.
pub fn ali_booking() -> Value {
    serde_json::json!({
        "phone": "0791234567",
        "country_code": "962",
        "patient_name": "Ali",
        "appointment_date": "2024-01-01",
        "appointment_time": "10:00"
    })
}
