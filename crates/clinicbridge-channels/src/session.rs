//! Session lifecycle management.
//!
//! [`SessionManager`] owns the single chat-network session: it loads and
//! persists credentials, drives the transport connection through the
//! [`SessionState`] machine, re-connects after non-logout disconnects, and
//! gates outbound sends on readiness.
//!
//! The state lives in a `watch` channel. It is the only source of truth for
//! readiness, so observers and the send gate can never disagree.

use crate::credentials::CredentialStore;
use crate::error::ChannelError;
use crate::reconnect::ReconnectPolicy;
use crate::traits::{
    DisconnectReason, SendReceipt, Transport, TransportEvent, EVENT_CHANNEL_CAPACITY,
};
use crate::Result;
use chrono::{DateTime, Utc};
use clinicbridge_core::config::SessionConfig;
use clinicbridge_core::SessionState;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default upper bound on a single transport send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Mutable session details that are not part of the state machine.
#[derive(Debug, Default)]
struct SessionMeta {
    pairing_code: Option<String>,
    last_error: Option<String>,
    reconnect_attempts: u32,
    connected_since: Option<DateTime<Utc>>,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub reconnect_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_since: Option<DateTime<Utc>>,
}

/// Owner of the single chat-network session.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    policy: ReconnectPolicy,
    send_timeout: Duration,
    state: watch::Sender<SessionState>,
    meta: Mutex<SessionMeta>,
    cancel: CancellationToken,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("transport", &self.transport.name())
            .field("state", &self.current_state())
            .field("policy", &self.policy)
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

/// How the event loop for one connection ended.
enum ConnectionEnd {
    Disconnected(DisconnectReason),
    Cancelled,
}

impl SessionManager {
    /// Create a manager in the `Initializing` state. Call [`start`](Self::start)
    /// to begin connecting.
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            transport,
            store,
            policy: ReconnectPolicy::default(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            state,
            meta: Mutex::new(SessionMeta::default()),
            cancel: CancellationToken::new(),
            driver: Mutex::new(None),
        }
    }

    /// Create a manager using the reconnect policy and send timeout from config.
    pub fn from_config(
        config: &SessionConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self::new(transport, store)
            .with_reconnect_policy(ReconnectPolicy::from(&config.reconnect))
            .with_send_timeout(Duration::from_secs(config.send_timeout_secs))
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Spawn the background driver. Calling `start` more than once has no
    /// further effect.
    pub fn start(self: &Arc<Self>) {
        let mut driver = self.driver.lock();
        if driver.is_some() {
            return;
        }

        info!(transport = self.transport.name(), "starting session");
        let manager = Arc::clone(self);
        *driver = Some(tokio::spawn(async move { manager.drive().await }));
    }

    /// Stop the driver and close the transport.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.driver.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "session driver ended abnormally");
            }
        }
        info!(state = %self.current_state(), "session stopped");
    }

    /// Current lifecycle state.
    pub fn current_state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Whether outbound sends are permitted.
    pub fn is_ready(&self) -> bool {
        self.current_state().is_ready()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Pairing code awaiting the operator, if any.
    pub fn pairing_code(&self) -> Option<String> {
        self.meta.lock().pairing_code.clone()
    }

    /// Most recent connection or persistence error.
    pub fn last_error(&self) -> Option<String> {
        self.meta.lock().last_error.clone()
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.current_state();
        let meta = self.meta.lock();
        SessionStatus {
            state,
            pairing_code: meta.pairing_code.clone(),
            last_error: meta.last_error.clone(),
            reconnect_attempts: meta.reconnect_attempts,
            connected_since: meta.connected_since,
        }
    }

    /// Wait until `predicate` holds for the current state, or `timeout` elapses.
    pub async fn wait_for<F>(&self, predicate: F, timeout: Duration) -> Option<SessionState>
    where
        F: Fn(SessionState) -> bool,
    {
        let mut rx = self.subscribe();
        let wait = async {
            loop {
                let state = *rx.borrow_and_update();
                if predicate(state) {
                    return Some(state);
                }
                if rx.changed().await.is_err() {
                    return None;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }

    /// Send a text message through the transport.
    ///
    /// Fails fast with [`ChannelError::NotConnected`] when the session is not
    /// ready; the transport is not touched in that case. A send that exceeds
    /// the configured timeout fails with [`ChannelError::Timeout`].
    pub async fn send_text(&self, recipient: &str, body: &str) -> Result<SendReceipt> {
        let state = self.current_state();
        if !state.is_ready() {
            return Err(ChannelError::NotConnected(state));
        }

        match tokio::time::timeout(self.send_timeout, self.transport.send_text(recipient, body))
            .await
        {
            Ok(Ok(receipt)) => {
                debug!(recipient, message_id = ?receipt.message_id, "transport accepted message");
                Ok(receipt)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ChannelError::Timeout(self.send_timeout)),
        }
    }

    /// Revoke the session: log out with the network, delete persisted
    /// credentials and enter the terminal `LoggedOut` state.
    pub async fn logout(&self) -> Result<()> {
        if self.current_state().is_terminal() {
            return Ok(());
        }

        if let Err(e) = self.transport.logout().await {
            warn!(error = %e, "transport logout failed, clearing local credentials anyway");
        }

        self.transition(SessionState::LoggedOut);
        self.cancel.cancel();
        self.meta.lock().pairing_code = None;

        self.store.clear().await.map_err(|e| {
            error!(error = %e, "failed to delete credentials after logout");
            self.record_error(e.to_string());
            match e {
                ChannelError::Persistence(_) => e,
                other => ChannelError::persistence(other.to_string()),
            }
        })?;

        info!("session logged out");
        Ok(())
    }

    fn transition(&self, next: SessionState) -> bool {
        let mut previous = next;
        let changed = self.state.send_if_modified(|state| {
            if *state != next && state.can_transition_to(next) {
                previous = *state;
                *state = next;
                true
            } else {
                false
            }
        });

        if changed {
            info!(from = %previous, to = %next, "session state changed");
        } else if self.current_state() != next {
            debug!(current = %self.current_state(), rejected = %next, "ignored state transition");
        }
        changed
    }

    fn record_error(&self, message: String) {
        self.meta.lock().last_error = Some(message);
    }

    async fn drive(self: Arc<Self>) {
        loop {
            if self.cancel.is_cancelled() || self.current_state().is_terminal() {
                break;
            }

            match self.run_connection().await {
                Ok(ConnectionEnd::Cancelled) => break,
                Ok(ConnectionEnd::Disconnected(DisconnectReason::LoggedOut)) => {
                    self.handle_remote_logout().await;
                    break;
                }
                Ok(ConnectionEnd::Disconnected(reason)) => {
                    warn!(%reason, "session disconnected");
                    self.record_error(reason.to_string());
                    self.transition(SessionState::Disconnected);
                }
                Err(e) => {
                    warn!(error = %e, "connection attempt failed");
                    self.record_error(e.to_string());
                    self.transition(SessionState::Disconnected);
                }
            }

            if !self.wait_before_reconnect().await {
                break;
            }
        }

        if let Err(e) = self.transport.close().await {
            debug!(error = %e, "transport close failed");
        }
        debug!(state = %self.current_state(), "session driver exited");
    }

    /// One connection: connect, then consume events until it ends.
    async fn run_connection(&self) -> Result<ConnectionEnd> {
        let credentials = self.store.load().await?;
        match &credentials {
            Some(c) => info!(fingerprint = %c.fingerprint(), "resuming with stored credentials"),
            None => info!("no stored credentials, pairing required"),
        }

        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::select! {
            _ = self.cancel.cancelled() => return Ok(ConnectionEnd::Cancelled),
            result = self.transport.connect(credentials, tx) => result?,
        }

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(ConnectionEnd::Cancelled),
                event = rx.recv() => event,
            };

            match event {
                Some(TransportEvent::PairingCode(code)) => self.on_pairing_code(code),
                Some(TransportEvent::Connected) => self.on_connected(),
                Some(TransportEvent::CredentialsUpdated(credentials)) => {
                    match self.store.save(&credentials).await {
                        Ok(()) => {
                            info!(fingerprint = %credentials.fingerprint(), "credentials persisted")
                        }
                        Err(e) => {
                            error!(error = %e, "failed to persist credentials");
                            self.record_error(e.to_string());
                        }
                    }
                }
                Some(TransportEvent::Disconnected(reason)) => {
                    return Ok(ConnectionEnd::Disconnected(reason));
                }
                None => {
                    return Ok(ConnectionEnd::Disconnected(DisconnectReason::ConnectionLost(
                        "transport event stream closed".to_string(),
                    )));
                }
            }
        }
    }

    fn on_pairing_code(&self, code: String) {
        let state = self.current_state();
        if !matches!(
            state,
            SessionState::Initializing | SessionState::Reconnecting | SessionState::AwaitingPairing
        ) {
            debug!(%state, "ignoring pairing code");
            return;
        }

        self.meta.lock().pairing_code = Some(code.clone());
        self.transition(SessionState::AwaitingPairing);
        info!(pairing_code = %code, "pairing required, scan the code with the phone app");
    }

    fn on_connected(&self) {
        if self.transition(SessionState::Connected) {
            let mut meta = self.meta.lock();
            meta.pairing_code = None;
            meta.last_error = None;
            meta.reconnect_attempts = 0;
            meta.connected_since = Some(Utc::now());
        }
    }

    async fn handle_remote_logout(&self) {
        warn!("session logged out by the network, re-pairing required");
        self.transition(SessionState::LoggedOut);
        {
            let mut meta = self.meta.lock();
            meta.pairing_code = None;
            meta.connected_since = None;
        }
        if let Err(e) = self.store.clear().await {
            error!(error = %e, "failed to delete revoked credentials");
            self.record_error(e.to_string());
        }
    }

    /// Enter `Reconnecting` and sleep for the policy delay. Returns `false`
    /// when the session was stopped meanwhile.
    async fn wait_before_reconnect(&self) -> bool {
        let attempt = {
            let mut meta = self.meta.lock();
            meta.reconnect_attempts = meta.reconnect_attempts.saturating_add(1);
            meta.connected_since = None;
            meta.reconnect_attempts
        };
        if !self.transition(SessionState::Reconnecting) {
            return false;
        }

        let delay = self.policy.delay_for(attempt);
        info!(attempt, delay_ms = delay.as_millis() as u64, "scheduling reconnect");

        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => !self.current_state().is_terminal(),
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
