//! Transport seam between the session manager and a chat-network protocol.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinicbridge_core::id;
use std::fmt;
use tokio::sync::mpsc;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Sender half handed to a transport on every connect.
///
/// Dropping it tells the session manager the connection is gone.
pub type EventSender = mpsc::Sender<TransportEvent>;

/// Capacity of the per-connection event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Opaque session key material produced by pairing.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    data: Vec<u8>,
}

impl Credentials {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Log-safe fingerprint of the key material.
    pub fn fingerprint(&self) -> String {
        id::fingerprint(&self.data)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("len", &self.data.len())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Why a transport connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The account revoked this device. Credentials are no longer valid.
    LoggedOut,

    /// The connection dropped and may be re-established.
    ConnectionLost(String),
}

impl DisconnectReason {
    pub fn is_logout(&self) -> bool {
        matches!(self, Self::LoggedOut)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => f.write_str("logged out"),
            Self::ConnectionLost(reason) => write!(f, "connection lost: {}", reason),
        }
    }
}

/// Events a transport reports for its current connection.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// No usable credentials; the operator must scan or enter this code.
    PairingCode(String),

    /// The session is open and authenticated.
    Connected,

    /// New key material that must be persisted.
    CredentialsUpdated(Credentials),

    /// The connection ended.
    Disconnected(DisconnectReason),
}

/// Result of a successful send.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Message ID assigned by the network, when reported.
    pub message_id: Option<String>,

    /// When the transport accepted the message.
    pub timestamp: DateTime<Utc>,
}

impl SendReceipt {
    pub fn new(message_id: Option<String>) -> Self {
        Self {
            message_id,
            timestamp: Utc::now(),
        }
    }
}

impl Default for SendReceipt {
    fn default() -> Self {
        Self::new(None)
    }
}

/// A chat-network protocol implementation.
///
/// The session manager owns at most one live connection at a time. Each
/// `connect` receives a fresh [`EventSender`]; the transport reports events
/// for that connection on it and drops it when the connection ends.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Transport identifier used in logs.
    fn name(&self) -> &str;

    /// Open a connection, resuming with `credentials` when present.
    ///
    /// Returns once the connection attempt is underway. An error means the
    /// attempt failed outright.
    async fn connect(&self, credentials: Option<Credentials>, events: EventSender) -> Result<()>;

    /// Send a text message to a normalized recipient address.
    async fn send_text(&self, recipient: &str, body: &str) -> Result<SendReceipt>;

    /// Revoke this device's credentials with the network.
    async fn logout(&self) -> Result<()>;

    /// Close the current connection without revoking credentials.
    async fn close(&self) -> Result<()>;
}
