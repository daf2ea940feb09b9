//! Commands that talk to a running gateway.

use crate::client::ApiClient;
use crate::{load_config, render};
use clap::Args;
use clinicbridge_core::{DeliveryRecord, SessionState};
use clinicbridge_gateway::handlers::session::{LogoutResponse, PairingResponse, StatusResponse};
use std::path::Path;

/// Where to find the gateway.
#[derive(Args, Debug, Default)]
pub struct RemoteArgs {
    /// Gateway base URL (defaults to the configured port on 127.0.0.1)
    #[arg(long, env = "CLINICBRIDGE_URL")]
    pub url: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Print the raw JSON response
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct MessagesArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Maximum number of records to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Print the raw JSON response
    #[arg(long)]
    pub json: bool,
}

fn client(remote: RemoteArgs, config_path: Option<&Path>) -> anyhow::Result<ApiClient> {
    let config = load_config(config_path)?;
    ApiClient::from_config(&config, remote.url)
}

/// `clinicbridge status`
pub async fn status(args: StatusArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let client = client(args.remote, config_path)?;
    let status: StatusResponse = client.get("/status").await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Gateway:   {}", client.base_url());
    println!("State:     {}", render::state_label(status.state));
    println!("Connected: {}", if status.connected { "yes" } else { "no" });
    if status.reconnect_attempts > 0 {
        println!("Attempts:  {}", status.reconnect_attempts);
    }
    if let Some(error) = &status.last_error {
        println!("Error:     {}", error);
    }

    if status.state == SessionState::AwaitingPairing {
        let pairing: PairingResponse = client.get("/pairing").await?;
        if let Some(code) = pairing.pairing_code {
            render::render_pairing_banner(&code);
        }
    }
    Ok(())
}

/// `clinicbridge messages`
pub async fn messages(args: MessagesArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let client = client(args.remote, config_path)?;
    let records: Vec<DeliveryRecord> = client
        .get(&format!("/messages?limit={}", args.limit))
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No messages recorded.");
        return Ok(());
    }
    for record in &records {
        println!("{}", render::format_record(record));
    }
    Ok(())
}

/// `clinicbridge logout`
pub async fn logout(args: RemoteArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let client = client(args, config_path)?;
    let response: LogoutResponse = client.post("/logout").await?;
    println!("{}", response.message);
    Ok(())
}
