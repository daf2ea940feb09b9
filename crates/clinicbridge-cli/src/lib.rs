//! ClinicBridge command-line interface.

pub mod client;
pub mod commands;
pub mod logging;
pub mod render;

use clap::{Parser, Subcommand};
use clinicbridge_core::config::Config;
use std::path::{Path, PathBuf};

/// ClinicBridge - clinic notification gateway
#[derive(Parser)]
#[command(name = "clinicbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "CLINICBRIDGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the session and the HTTP gateway
    Run(commands::run::RunArgs),

    /// Show the session status of a running gateway
    Status(commands::remote::StatusArgs),

    /// List recent delivery attempts from a running gateway
    Messages(commands::remote::MessagesArgs),

    /// Log the running gateway out of the chat network
    Logout(commands::remote::RemoteArgs),

    /// Delete stored session credentials to force re-pairing
    ResetSession(commands::session::ResetSessionArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run(args) => commands::run::run(args, config_path).await,
        Commands::Status(args) => commands::remote::status(args, config_path).await,
        Commands::Messages(args) => commands::remote::messages(args, config_path).await,
        Commands::Logout(args) => commands::remote::logout(args, config_path).await,
        Commands::ResetSession(args) => commands::session::reset(args, config_path).await,
        Commands::Config(args) => commands::config::run(args, config_path).await,
        Commands::Version => {
            println!("clinicbridge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Load the config file (defaults when absent) and apply environment overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::load_or_default(path)?;
    config.apply_env_overrides();
    Ok(config)
}
