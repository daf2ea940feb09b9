//! HTTP client for a running gateway.

use anyhow::{bail, Context};
use clinicbridge_core::config::{BindMode, Config};
use clinicbridge_core::SecretString;
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Calls the gateway API with the configured bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<SecretString>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<SecretString>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    /// Target the gateway described by `config`, unless `url` overrides it.
    pub fn from_config(config: &Config, url: Option<String>) -> anyhow::Result<Self> {
        let base_url = url.unwrap_or_else(|| default_base_url(config));
        Self::new(base_url, config.gateway.auth_token.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let request = self.http.get(self.url(path));
        self.send(request).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let request = self.http.post(self.url(path));
        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> anyhow::Result<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request
            .send()
            .await
            .with_context(|| format!("gateway not reachable at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"));
            bail!("gateway returned {}: {}", status.as_u16(), message);
        }

        response
            .json()
            .await
            .context("gateway returned an unexpected response")
    }
}

/// `http://127.0.0.1:<port>` for both bind modes; a LAN bind is also
/// reachable on loopback.
pub fn default_base_url(config: &Config) -> String {
    let host = match config.gateway.bind {
        BindMode::Loopback | BindMode::Lan => "127.0.0.1",
    };
    format!("http://{}:{}", host, config.gateway.port)
}
