//! Chat-network session lifecycle for ClinicBridge.
//!
//! This crate owns the single long-lived chat-network session: the
//! [`Transport`] seam, the [`SessionManager`] state machine with pairing,
//! reconnect and readiness gating, credential persistence, and phone number
//! normalization.

pub mod error;
pub mod traits;
pub mod credentials;
pub mod phone;
pub mod reconnect;
pub mod session;
pub mod loopback;

#[cfg(feature = "bridge")]
pub mod bridge;

pub use error::ChannelError;
pub use traits::{Credentials, DisconnectReason, EventSender, SendReceipt, Transport, TransportEvent};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use reconnect::ReconnectPolicy;
pub use session::{SessionManager, SessionStatus};
pub use loopback::{LoopbackTransport, SentMessage};

#[cfg(feature = "bridge")]
pub use bridge::BridgeTransport;

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
