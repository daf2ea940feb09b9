//! Local session maintenance.

use crate::client::default_base_url;
use crate::load_config;
use clap::Args;
use clinicbridge_channels::{CredentialStore, FileCredentialStore};
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpStream;

/// Reset-session arguments.
#[derive(Args, Debug, Default)]
pub struct ResetSessionArgs {
    /// Delete credentials even if a gateway appears to be running
    #[arg(short, long)]
    pub force: bool,
}

/// `clinicbridge reset-session`
pub async fn reset(args: ResetSessionArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let path = config.credentials_path()?;

    if !args.force && gateway_running(config.gateway.port).await {
        anyhow::bail!(
            "A gateway is running at {}. Use `clinicbridge logout`, or stop it and retry (--force to skip this check).",
            default_base_url(&config)
        );
    }

    if !path.exists() {
        println!("No stored session at {}", path.display());
        return Ok(());
    }

    FileCredentialStore::new(&path).clear().await?;
    println!("Removed session credentials: {}", path.display());
    println!("The next `clinicbridge run` will ask for pairing.");
    Ok(())
}

async fn gateway_running(port: u16) -> bool {
    let connect = TcpStream::connect(("127.0.0.1", port));
    matches!(
        tokio::time::timeout(Duration::from_millis(500), connect).await,
        Ok(Ok(_))
    )
}
