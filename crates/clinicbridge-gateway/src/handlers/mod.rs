//! HTTP route handlers.
//!
//! Each handler is a thin translation between a request body and a
//! [`DeliveryCoordinator`](clinicbridge_notify::DeliveryCoordinator) or
//! [`SessionManager`](clinicbridge_channels::SessionManager) call.

pub mod health;
pub mod messages;
pub mod send;
pub mod session;

pub use health::health;
pub use messages::list_messages;
pub use send::{send_booking, send_payment, SendResponse};
pub use session::{logout, pairing, status};

use clinicbridge_notify::DeliveryCoordinator;
use std::sync::Arc;
use std::time::Instant;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Delivery coordinator. Also owns the session and audit log.
    pub coordinator: Arc<DeliveryCoordinator>,

    /// When the gateway was built.
    pub started_at: Instant,
}

impl HandlerContext {
    pub fn new(coordinator: Arc<DeliveryCoordinator>) -> Self {
        Self {
            coordinator,
            started_at: Instant::now(),
        }
    }
}
