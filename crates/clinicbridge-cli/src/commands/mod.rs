//! CLI command implementations.

pub mod config;
pub mod remote;
pub mod run;
pub mod session;
