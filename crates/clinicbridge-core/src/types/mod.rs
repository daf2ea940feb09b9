//! Core type definitions for ClinicBridge.

mod delivery;
mod notification;
mod session;

pub use delivery::*;
pub use notification::*;
pub use session::*;
