//! Tracing subscriber setup.

use clinicbridge_core::config::{LogFormat, LogLevel, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Logs go to stderr so that command output on stdout stays parseable.
pub fn init(config: &LoggingConfig, verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.level, verbose)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("failed to initialize logging: {e}");
    }
}

/// Filter directives for `level`, raised by each `-v`.
pub fn default_directives(level: LogLevel, verbose: u8) -> String {
    let level = match (verbose, level) {
        (0, level) => level,
        (1, LogLevel::Trace) => LogLevel::Trace,
        (1, _) => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    let http = if verbose > 0 { "debug" } else { "warn" };
    format!("clinicbridge={},tower_http={}", level.as_str(), http)
}
