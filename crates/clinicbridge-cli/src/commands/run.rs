//! Run command: session driver plus HTTP gateway.

use crate::{load_config, render};
use clap::{Args, ValueEnum};
use clinicbridge_channels::{
    BridgeTransport, FileCredentialStore, LoopbackTransport, SessionManager, Transport,
};
use clinicbridge_core::config::{BindMode, Config, TransportKind};
use clinicbridge_gateway::{shutdown_signal, Gateway};
use clinicbridge_notify::{AuditLog, DeliveryCoordinator};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Run command arguments. Flags override the config file and environment.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Port number
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Bind mode
    #[arg(short, long, value_enum)]
    pub bind: Option<BindArg>,

    /// Message transport
    #[arg(short, long, value_enum)]
    pub transport: Option<TransportArg>,

    /// WebSocket URL of the chat-network bridge
    #[arg(long)]
    pub bridge_url: Option<String>,

    /// Country code for numbers given in national format
    #[arg(long)]
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BindArg {
    Loopback,
    Lan,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TransportArg {
    Bridge,
    Loopback,
}

impl RunArgs {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if let Some(bind) = self.bind {
            config.gateway.bind = match bind {
                BindArg::Loopback => BindMode::Loopback,
                BindArg::Lan => BindMode::Lan,
            };
        }
        if let Some(transport) = self.transport {
            config.transport.kind = match transport {
                TransportArg::Bridge => TransportKind::Bridge,
                TransportArg::Loopback => TransportKind::Loopback,
            };
        }
        if let Some(url) = &self.bridge_url {
            config.transport.bridge_url = url.clone();
        }
        if let Some(code) = &self.country_code {
            config.notifications.default_country_code = code.clone();
        }
    }
}

/// Run the gateway until ctrl-c.
pub async fn run(args: RunArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config);
    config.validate()?;

    let transport = build_transport(&config)?;
    let credentials_path = config.credentials_path()?;
    let audit_path = config.audit_path()?;
    info!(
        transport = transport.name(),
        credentials = %credentials_path.display(),
        audit = %audit_path.display(),
        "starting clinicbridge"
    );

    let store = Arc::new(FileCredentialStore::new(credentials_path));
    let session = Arc::new(SessionManager::from_config(&config.session, transport, store));
    session.start();
    let watcher = tokio::spawn(render::watch_session(Arc::clone(&session)));

    let audit = Arc::new(AuditLog::json_file(audit_path, config.audit.retention));
    let coordinator = Arc::new(DeliveryCoordinator::from_config(
        &config.notifications,
        Arc::clone(&session),
        audit,
    ));

    let gateway = Gateway::new(config.gateway.clone(), coordinator);
    let result = gateway.run(shutdown_signal()).await;

    watcher.abort();
    session.shutdown().await;
    info!("clinicbridge stopped");

    result.map_err(Into::into)
}

fn build_transport(config: &Config) -> anyhow::Result<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match config.transport.kind {
        TransportKind::Bridge => Arc::new(BridgeTransport::new(&config.transport.bridge_url)?),
        TransportKind::Loopback => {
            warn!("loopback transport selected, messages are recorded locally and not delivered");
            Arc::new(LoopbackTransport::new())
        }
    };
    Ok(transport)
}
