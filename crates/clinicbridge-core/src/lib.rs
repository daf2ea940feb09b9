//! # clinicbridge-core
//!
//! Core types, configuration, and utilities for ClinicBridge.
//!
//! This crate provides shared functionality used across all ClinicBridge crates:
//!
//! - **Configuration**: Loading, validation, and environment overrides
//! - **Types**: Session states, notification requests, and delivery records
//! - **Utilities**: Path resolution, ID generation, and environment handling

pub mod config;
pub mod types;
pub mod error;
pub mod paths;
pub mod env;
pub mod id;
pub mod secret;

// Re-exports for convenience
pub use config::Config;
pub use error::ConfigError;
pub use types::*;
pub use secret::SecretString;
