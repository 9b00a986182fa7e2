//! Shared HTTP transport and authentication store.
//!
//! One `reqwest::Client` is built at start-up and cloned into every
//! adapter through a [`ServiceContext`]; nothing here is process-wide.

use crate::error::{Result, SourceError};
use crate::model::ServiceType;
use reqwest::{Client, RequestBuilder, Response};
use sbconfig::Config;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client with compression negotiation and no cookie persistence
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .gzip(true)
            .deflate(true)
            .build()?;
        Ok(Self { client })
    }

    /// Builds the transport from `host.http.*`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.get_http_timeout_secs()? as u64);
        Ok(Self::new(timeout, &config.get_user_agent())?)
    }

    /// GET `url` with query `params`, decoding a JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<T> {
        debug!("GET {} with {} params", url, params.len());
        let request = self.client.get(url).query(params);
        self.send(request, bearer).await
    }

    /// POST a JSON `body` to `url`, decoding a JSON answer
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        params: &[(&str, String)],
        body: &B,
        bearer: Option<&str>,
    ) -> Result<T> {
        debug!("POST {} with {} params", url, params.len());
        let request = self.client.post(url).query(params).json(body);
        self.send(request, bearer).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        mut request: RequestBuilder,
        bearer: Option<&str>,
    ) -> Result<T> {
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let status_code = status.as_u16();

        debug!("Response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("API error ({}): {}", status_code, error_text);
            return Err(SourceError::from_status_code(status_code, error_text));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            SourceError::from(e)
        })
    }
}

/// Supplies a valid bearer token per service.
///
/// Tokens are opaque: the core never refreshes nor persists them.
pub trait AuthStore: Send + Sync {
    fn token(&self, service: ServiceType) -> Option<String>;
}

/// In-memory tokens
#[derive(Debug, Clone, Default)]
pub struct StaticAuthStore {
    tokens: HashMap<ServiceType, String>,
}

impl StaticAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, service: ServiceType, token: impl Into<String>) -> Self {
        self.tokens.insert(service, token.into());
        self
    }
}

impl AuthStore for StaticAuthStore {
    fn token(&self, service: ServiceType) -> Option<String> {
        self.tokens.get(&service).cloned()
    }
}

/// Tokens read from `services.<id>.token`
#[derive(Debug, Clone)]
pub struct ConfigAuthStore {
    config: Arc<Config>,
}

impl ConfigAuthStore {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl AuthStore for ConfigAuthStore {
    fn token(&self, service: ServiceType) -> Option<String> {
        self.config.get_service_value(service.id(), "token")
    }
}

/// What every adapter and resolver is constructed with
#[derive(Clone)]
pub struct ServiceContext {
    pub transport: HttpTransport,
    pub auth: Arc<dyn AuthStore>,
}

impl ServiceContext {
    pub fn new(transport: HttpTransport, auth: Arc<dyn AuthStore>) -> Self {
        Self { transport, auth }
    }

    /// Transport from `host.http.*`, tokens from `services.<id>.token`
    pub fn from_config(config: Arc<Config>) -> anyhow::Result<Self> {
        let transport = HttpTransport::from_config(&config)?;
        Ok(Self::new(transport, Arc::new(ConfigAuthStore::new(config))))
    }

    pub fn token(&self, service: ServiceType) -> Option<String> {
        self.auth.token(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_store_hands_out_tokens() {
        let store = StaticAuthStore::new().with_token(ServiceType::SoundCloud, "abc");
        assert_eq!(store.token(ServiceType::SoundCloud).as_deref(), Some("abc"));
        assert_eq!(store.token(ServiceType::YouTube), None);
    }

    #[test]
    fn config_store_reads_service_tokens() {
        let config = Config::from_yaml_str("services:\n  youtube:\n    token: yt-token\n").unwrap();
        let store = ConfigAuthStore::new(Arc::new(config));
        assert_eq!(store.token(ServiceType::YouTube).as_deref(), Some("yt-token"));
        assert_eq!(store.token(ServiceType::SoundCloud), None);
    }
}
