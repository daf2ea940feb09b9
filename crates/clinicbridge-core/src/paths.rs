//! Path resolution utilities.

use crate::env;
use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the ClinicBridge base directory (`$CLINICBRIDGE_HOME` or `~/.clinicbridge`).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = env::get_var(env::vars::CLINICBRIDGE_HOME) {
        return Ok(expand_tilde(&home));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".clinicbridge"))
}

/// Get the main config file path (~/.clinicbridge/clinicbridge.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("clinicbridge.json5"))
}

/// Get the session directory (~/.clinicbridge/session).
pub fn session_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("session"))
}

/// Get the default credentials file (~/.clinicbridge/session/credentials.json).
pub fn credentials_file() -> Result<PathBuf, ConfigError> {
    Ok(session_dir()?.join("credentials.json"))
}

/// Get the audit log directory (~/.clinicbridge/audit).
pub fn audit_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("audit"))
}

/// Get the default audit log file (~/.clinicbridge/audit/messages.json).
pub fn audit_file() -> Result<PathBuf, ConfigError> {
    Ok(audit_dir()?.join("messages.json"))
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_files_live_under_base_dir() {
        let base = base_dir().unwrap();
        assert!(config_file().unwrap().starts_with(&base));
        assert!(credentials_file().unwrap().ends_with("session/credentials.json"));
        assert!(audit_file().unwrap().ends_with("audit/messages.json"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/test");
        assert!(!expanded.to_string_lossy().contains('~'));

        assert_eq!(expand_tilde("/var/lib/x"), PathBuf::from("/var/lib/x"));
    }
}
