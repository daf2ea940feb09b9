//! HTTP gateway for ClinicBridge.
//!
//! This crate provides:
//! - JSON routes for booking and payment notifications
//! - Session status, pairing and logout endpoints
//! - The delivery audit log listing
//! - Optional bearer authentication, CORS and request tracing

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::GatewayError;
pub use handlers::HandlerContext;
pub use server::{shutdown_signal, Gateway};

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
