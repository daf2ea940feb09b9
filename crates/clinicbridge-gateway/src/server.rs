//! HTTP gateway server.

use crate::auth::require_bearer;
use crate::error::GatewayError;
use crate::handlers::{self, HandlerContext};
use crate::Result;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{middleware, Router};
use clinicbridge_core::config::{BindMode, GatewayConfig};
use clinicbridge_core::SecretString;
use clinicbridge_notify::DeliveryCoordinator;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Hosts accepted as browser origins for CORS.
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

/// The HTTP gateway.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    context: HandlerContext,
}

impl Gateway {
    pub fn new(config: GatewayConfig, coordinator: Arc<DeliveryCoordinator>) -> Self {
        Self {
            config,
            context: HandlerContext::new(coordinator),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the axum router.
    pub fn router(&self) -> Router {
        let mut protected = Router::new()
            .route("/status", get(handlers::status))
            .route("/messages", get(handlers::list_messages))
            .route("/send-booking", post(handlers::send_booking))
            .route("/send-payment", post(handlers::send_payment))
            .route("/pairing", get(handlers::pairing))
            .route("/logout", post(handlers::logout));

        if let Some(token) = self.auth_token() {
            protected = protected.route_layer(middleware::from_fn_with_state(
                Arc::new(token.clone()),
                require_bearer,
            ));
        }

        let mut router = Router::new()
            .route("/health", get(handlers::health))
            .merge(protected)
            .with_state(self.context.clone());

        if self.config.cors {
            router = router.layer(create_cors_layer());
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// Configured bearer token. An empty token disables auth.
    fn auth_token(&self) -> Option<&SecretString> {
        self.config
            .auth_token
            .as_ref()
            .filter(|t| !t.expose_secret().is_empty())
    }

    /// Whether the API is reachable from the network with auth disabled.
    fn is_exposed_without_auth(&self) -> bool {
        self.config.bind != BindMode::Loopback && self.auth_token().is_none()
    }

    /// Get the bind address.
    pub fn bind_address(&self) -> SocketAddr {
        let ip = match self.config.bind {
            BindMode::Loopback => [127, 0, 0, 1],
            BindMode::Lan => [0, 0, 0, 0],
        };

        SocketAddr::from((ip, self.config.port))
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.bind_address();

        if self.is_exposed_without_auth() {
            warn!("========================================");
            warn!("  SECURITY WARNING: Gateway binding to {}", addr);
            warn!("  The API is reachable from the network without a token.");
            warn!("  Set gateway.auth_token or CLINICBRIDGE_AUTH_TOKEN.");
            warn!("========================================");
        }

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!(%addr, error = %e, "failed to bind gateway");
            GatewayError::Io(e)
        })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = listener.local_addr()?;
        info!("Starting gateway server on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        info!("Gateway server stopped");
        Ok(())
    }
}

fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _parts: &Parts| {
            origin.to_str().map(is_loopback_origin).unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Whether `origin` is an http(s) origin on a loopback host, any port.
fn is_loopback_origin(origin: &str) -> bool {
    let Some(rest) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };

    LOOPBACK_HOSTS.iter().any(|host| match rest.strip_prefix(host) {
        Some("") => true,
        Some(port) => port
            .strip_prefix(':')
            .is_some_and(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    })
}

/// Resolves on ctrl-c, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
