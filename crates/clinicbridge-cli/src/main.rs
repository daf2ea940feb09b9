//! ClinicBridge CLI entry point.

use clap::Parser;
use clinicbridge_cli::{load_config, logging, run, Cli};
use clinicbridge_core::config::LoggingConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A broken config file is reported by the command itself.
    let logging_config = load_config(cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_else(|_| LoggingConfig::default());
    logging::init(&logging_config, cli.verbose);

    run(cli).await
}
