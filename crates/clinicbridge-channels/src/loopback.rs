//! In-process transport.
//!
//! Records outbound messages instead of delivering them. Pairing,
//! disconnects, connect failures and send failures can be driven from the
//! outside, which makes it the transport for local development runs and for
//! exercising the session lifecycle in tests.

use crate::error::ChannelError;
use crate::traits::{
    Credentials, DisconnectReason, EventSender, SendReceipt, Transport, TransportEvent,
};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pairing code reported when pairing is required.
const LOOPBACK_PAIRING_CODE: &str = "LOOPBACK-PAIRING-CODE";

/// A message accepted by the loopback transport.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message_id: String,
    pub recipient: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LoopbackState {
    events: Option<EventSender>,
    require_pairing: bool,
    connect_attempts: u32,
    failing_connects: u32,
    send_failures: VecDeque<String>,
    send_delay: Option<Duration>,
    sent: Vec<SentMessage>,
    logged_out: bool,
}

/// Transport that keeps everything in process.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    state: Mutex<LoopbackState>,
}

impl LoopbackTransport {
    /// Connects immediately, with or without credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a pairing code when connecting without credentials, and wait
    /// for [`complete_pairing`](Self::complete_pairing).
    pub fn requiring_pairing(self) -> Self {
        self.state.lock().require_pairing = true;
        self
    }

    /// Finish a pending pairing: issue credentials and open the session.
    pub fn complete_pairing(&self) {
        let credentials = Credentials::new(issue_credentials());
        self.emit(TransportEvent::CredentialsUpdated(credentials));
        self.emit(TransportEvent::Connected);
    }

    /// End the current connection with `reason`.
    pub fn disconnect(&self, reason: DisconnectReason) {
        self.emit(TransportEvent::Disconnected(reason));
        self.state.lock().events = None;
    }

    /// End the current connection without reporting a reason.
    pub fn drop_connection(&self) {
        self.state.lock().events = None;
    }

    /// Refuse the next `count` connection attempts.
    pub fn fail_connects(&self, count: u32) {
        self.state.lock().failing_connects = count;
    }

    /// Fail the next send with `message`.
    pub fn fail_next_send(&self, message: impl Into<String>) {
        self.state.lock().send_failures.push_back(message.into());
    }

    /// Delay every send by `delay`.
    pub fn set_send_delay(&self, delay: Duration) {
        self.state.lock().send_delay = Some(delay);
    }

    /// Messages accepted so far, oldest first.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().sent.clone()
    }

    pub fn connect_attempts(&self) -> u32 {
        self.state.lock().connect_attempts
    }

    /// Whether `logout` has been called.
    pub fn logged_out(&self) -> bool {
        self.state.lock().logged_out
    }

    fn emit(&self, event: TransportEvent) {
        let events = self.state.lock().events.clone();
        match events {
            Some(events) => {
                if events.try_send(event).is_err() {
                    warn!("loopback event dropped, session not listening");
                }
            }
            None => debug!(?event, "loopback not connected, event dropped"),
        }
    }
}

fn issue_credentials() -> Vec<u8> {
    format!("loopback:{}", clinicbridge_core::id::uuid()).into_bytes()
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn name(&self) -> &str {
        "loopback"
    }

    async fn connect(&self, credentials: Option<Credentials>, events: EventSender) -> Result<()> {
        let initial = {
            let mut state = self.state.lock();
            state.connect_attempts += 1;
            if state.failing_connects > 0 {
                state.failing_connects -= 1;
                return Err(ChannelError::transport("loopback connection refused"));
            }
            state.logged_out = false;
            state.events = Some(events.clone());

            match credentials {
                Some(_) => vec![TransportEvent::Connected],
                None if state.require_pairing => {
                    vec![TransportEvent::PairingCode(LOOPBACK_PAIRING_CODE.to_string())]
                }
                None => vec![
                    TransportEvent::CredentialsUpdated(Credentials::new(issue_credentials())),
                    TransportEvent::Connected,
                ],
            }
        };

        for event in initial {
            events
                .send(event)
                .await
                .map_err(|_| ChannelError::transport("session stopped listening"))?;
        }
        Ok(())
    }

    async fn send_text(&self, recipient: &str, body: &str) -> Result<SendReceipt> {
        let delay = {
            let mut state = self.state.lock();
            if state.events.is_none() {
                return Err(ChannelError::transport("loopback not connected"));
            }
            if let Some(message) = state.send_failures.pop_front() {
                return Err(ChannelError::Transport(message));
            }
            state.send_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let message = SentMessage {
            message_id: format!("loopback-{}", clinicbridge_core::id::uuid()),
            recipient: recipient.to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
        };
        info!(recipient, chars = body.chars().count(), "loopback accepted message");

        let receipt = SendReceipt::new(Some(message.message_id.clone()));
        self.state.lock().sent.push(message);
        Ok(receipt)
    }

    async fn logout(&self) -> Result<()> {
        self.state.lock().logged_out = true;
        self.disconnect(DisconnectReason::LoggedOut);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.drop_connection();
        Ok(())
    }
}
