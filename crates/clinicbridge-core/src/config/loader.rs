//! Configuration loading, environment overrides, and persistence.

use super::{BindMode, Config, TransportKind};
use crate::env;
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Load from `path` (or the default path), falling back to defaults when
    /// no file exists. A file that exists but does not parse is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => paths::config_file()?,
        };

        match Self::load(&path) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded configuration");
                Ok(config)
            }
            Err(ConfigError::NotFound(_)) => {
                debug!(path = %path.display(), "no configuration file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; JSON is valid JSON5.
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(env::get_var);
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        use env::vars;

        let port = lookup(vars::CLINICBRIDGE_PORT).or_else(|| lookup(vars::LEGACY_PORT));
        if let Some(port) = port.and_then(|p| p.parse().ok()) {
            self.gateway.port = port;
        }
        if let Some(code) = lookup(vars::CLINICBRIDGE_COUNTRY_CODE) {
            self.notifications.default_country_code = code;
        }
        if let Some(path) = lookup(vars::CLINICBRIDGE_CREDENTIALS_PATH) {
            self.session.credentials_path = Some(paths::expand_tilde(&path));
        }
        if let Some(path) = lookup(vars::CLINICBRIDGE_AUDIT_PATH) {
            self.audit.path = Some(paths::expand_tilde(&path));
        }
        if let Some(retention) =
            lookup(vars::CLINICBRIDGE_AUDIT_RETENTION).and_then(|r| r.parse().ok())
        {
            self.audit.retention = retention;
        }
        if let Some(url) = lookup(vars::CLINICBRIDGE_BRIDGE_URL) {
            self.transport.bridge_url = url;
        }
        if let Some(token) = lookup(vars::CLINICBRIDGE_AUTH_TOKEN) {
            self.gateway.auth_token = Some(token.into());
        }
    }

    /// Resolved credentials file path.
    pub fn credentials_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.session.credentials_path {
            Some(path) => Ok(path.clone()),
            None => paths::credentials_file(),
        }
    }

    /// Resolved audit log file path.
    pub fn audit_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.audit.path {
            Some(path) => Ok(path.clone()),
            None => paths::audit_file(),
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.gateway.port == 0 {
            errors.push("Gateway port cannot be 0".to_string());
        }

        if self.audit.retention == 0 {
            errors.push("Audit retention must be at least 1".to_string());
        }

        let code = &self.notifications.default_country_code;
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            errors.push(format!(
                "Default country code must be digits only, got '{}'",
                code
            ));
        }

        let reconnect = &self.session.reconnect;
        if reconnect.delay_secs == 0 {
            errors.push("Reconnect delay_secs must be greater than 0".to_string());
        }
        if reconnect.max_delay_secs < reconnect.delay_secs {
            errors.push(format!(
                "Reconnect max_delay_secs ({}) is less than delay_secs ({})",
                reconnect.max_delay_secs, reconnect.delay_secs
            ));
        }

        if self.session.send_timeout_secs == 0 {
            errors.push("Session send_timeout_secs must be greater than 0".to_string());
        }

        if self.transport.kind == TransportKind::Bridge {
            match url::Url::parse(&self.transport.bridge_url) {
                Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
                Ok(url) => errors.push(format!(
                    "Bridge URL must use ws:// or wss://, got '{}://'",
                    url.scheme()
                )),
                Err(e) => errors.push(format!(
                    "Invalid bridge URL '{}': {}",
                    self.transport.bridge_url, e
                )),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

/// Configuration builder for creating configs programmatically.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gateway port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.gateway.port = port;
        self
    }

    /// Set the bind mode.
    pub fn bind(mut self, mode: BindMode) -> Self {
        self.config.gateway.bind = mode;
        self
    }

    /// Set the default country code.
    pub fn default_country_code(mut self, code: impl Into<String>) -> Self {
        self.config.notifications.default_country_code = code.into();
        self
    }

    /// Select the transport.
    pub fn transport(mut self, kind: TransportKind) -> Self {
        self.config.transport.kind = kind;
        self
    }

    /// Set the credentials file.
    pub fn credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.session.credentials_path = Some(path.into());
        self
    }

    /// Set the audit log file.
    pub fn audit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.audit.path = Some(path.into());
        self
    }

    /// Set the audit retention cap.
    pub fn audit_retention(mut self, retention: usize) -> Self {
        self.config.audit.retention = retention;
        self
    }

    /// Build the config.
    pub fn build(self) -> Config {
        self.config
    }

    /// Validate and build the config, returning an error if validation fails.
    pub fn build_validated(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
