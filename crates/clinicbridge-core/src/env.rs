//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Environment variable names read by ClinicBridge.
pub mod vars {
    /// ClinicBridge home directory override.
    pub const CLINICBRIDGE_HOME: &str = "CLINICBRIDGE_HOME";

    /// ClinicBridge config file override.
    pub const CLINICBRIDGE_CONFIG: &str = "CLINICBRIDGE_CONFIG";

    /// HTTP listening port.
    pub const CLINICBRIDGE_PORT: &str = "CLINICBRIDGE_PORT";

    /// Listening port name used by earlier deployments.
    pub const LEGACY_PORT: &str = "WHATSAPP_PORT";

    /// Default country code for phone normalization.
    pub const CLINICBRIDGE_COUNTRY_CODE: &str = "CLINICBRIDGE_COUNTRY_CODE";

    /// Session credentials file.
    pub const CLINICBRIDGE_CREDENTIALS_PATH: &str = "CLINICBRIDGE_CREDENTIALS_PATH";

    /// Audit log file.
    pub const CLINICBRIDGE_AUDIT_PATH: &str = "CLINICBRIDGE_AUDIT_PATH";

    /// Audit log retention cap.
    pub const CLINICBRIDGE_AUDIT_RETENTION: &str = "CLINICBRIDGE_AUDIT_RETENTION";

    /// Bridge transport WebSocket URL.
    pub const CLINICBRIDGE_BRIDGE_URL: &str = "CLINICBRIDGE_BRIDGE_URL";

    /// Bearer token required by the HTTP API.
    pub const CLINICBRIDGE_AUTH_TOKEN: &str = "CLINICBRIDGE_AUTH_TOKEN";
}
