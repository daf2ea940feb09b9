//! Configuration schema definitions.

use crate::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main ClinicBridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Transport selection.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Notification rendering defaults.
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Delivery audit log.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bind mode.
    #[serde(default)]
    pub bind: BindMode,

    /// Port number.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS for loopback origins.
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Bearer token required on every route except `/health`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<SecretString>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: BindMode::default(),
            port: default_port(),
            cors: true,
            auth_token: None,
        }
    }
}

fn default_port() -> u16 {
    3001
}

/// Bind mode for the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Bind to loopback only (127.0.0.1).
    #[default]
    Loopback,

    /// Bind to all interfaces.
    Lan,
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Credentials file. Defaults to `~/.clinicbridge/session/credentials.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,

    /// Upper bound on a single transport send.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,

    /// Reconnect policy.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            send_timeout_secs: default_send_timeout(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

fn default_send_timeout() -> u64 {
    30
}

/// Reconnect delay policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default)]
    pub strategy: ReconnectStrategy,

    /// Delay before the first attempt (and every attempt, for `fixed`).
    #[serde(default = "default_reconnect_delay")]
    pub delay_secs: u64,

    /// Cap for `exponential`.
    #[serde(default = "default_reconnect_max_delay")]
    pub max_delay_secs: u64,

    /// Add up to 20% random jitter to each delay.
    #[serde(default)]
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            strategy: ReconnectStrategy::default(),
            delay_secs: default_reconnect_delay(),
            max_delay_secs: default_reconnect_max_delay(),
            jitter: false,
        }
    }
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_reconnect_max_delay() -> u64 {
    60
}

/// Reconnect strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectStrategy {
    /// Same delay before every attempt.
    #[default]
    Fixed,

    /// Doubling delay, capped at `max_delay_secs`.
    Exponential,
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,

    /// WebSocket endpoint of the chat-network bridge.
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            bridge_url: default_bridge_url(),
        }
    }
}

fn default_bridge_url() -> String {
    "ws://127.0.0.1:3002/session".to_string()
}

/// Which transport carries outbound messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// External bridge process over WebSocket.
    #[default]
    Bridge,

    /// In-process transport that logs messages instead of delivering them.
    Loopback,
}

/// Notification rendering defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Country code used when a request does not carry one.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,

    /// Currency label appended to monetary lines.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            default_country_code: default_country_code(),
            currency: default_currency(),
        }
    }
}

fn default_country_code() -> String {
    "966".to_string()
}

fn default_currency() -> String {
    "SAR".to_string()
}

/// Audit log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Log file. Defaults to `~/.clinicbridge/audit/messages.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Maximum number of records kept.
    #[serde(default = "default_retention")]
    pub retention: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: None,
            retention: default_retention(),
        }
    }
}

fn default_retention() -> usize {
    200
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_true() -> bool {
    true
}
