//! Transactional notifications for ClinicBridge.
//!
//! - [`template`]: pure renderers for booking and payment messages
//! - [`audit`]: bounded, persisted log of delivery attempts
//! - [`delivery`]: the coordinator that ties rendering, sending and auditing together

pub mod error;
pub mod template;
pub mod audit;
pub mod delivery;

pub use error::{AuditError, DeliveryError, ValidationError};
pub use template::{RenderedMessage, TemplateEngine};
pub use audit::{AuditBackend, AuditLog, JsonFileBackend, MemoryBackend};
pub use delivery::{DeliveryCoordinator, DeliveryOutcome};
