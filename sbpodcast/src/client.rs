//! HTTP client for the iTunes Search API

use crate::config_ext::PodcastConfigExt;
use crate::models::ItunesSearchResponse;
use sbconfig::Config;
use sbsource::{Result, ServiceContext};
use tracing::debug;

/// Default Search API base URL
pub const DEFAULT_API_BASE: &str = "https://itunes.apple.com";

/// Default storefront
pub const DEFAULT_COUNTRY: &str = "us";

/// Largest result set the Search API returns
pub const MAX_LIMIT: u32 = 200;

#[derive(Clone)]
pub struct ITunesClient {
    context: ServiceContext,
    api_base: String,
    country: String,
}

impl ITunesClient {
    /// Create a builder for configuring the client
    pub fn builder(context: ServiceContext) -> ClientBuilder {
        ClientBuilder {
            context,
            api_base: DEFAULT_API_BASE.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }

    /// Create a client from `services.itunes.*`
    pub fn from_config(context: ServiceContext, config: &Config) -> Self {
        Self::builder(context)
            .api_base(config.get_itunes_api_base())
            .country(config.get_itunes_country())
            .build()
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// Podcasts matching `term`, at most `limit` of them
    pub(crate) async fn search_podcasts(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<ItunesSearchResponse> {
        let url = format!("{}/search", self.api_base);
        let params = [
            ("term", term.to_string()),
            ("country", self.country.clone()),
            ("entity", "podcast".to_string()),
            ("limit", limit.clamp(1, MAX_LIMIT).to_string()),
        ];
        let response: ItunesSearchResponse =
            self.context.transport.get_json(&url, &params, None).await?;
        debug!(term, results = response.results.len(), "itunes podcast search");
        Ok(response)
    }
}

/// Builder for [`ITunesClient`]
pub struct ClientBuilder {
    context: ServiceContext,
    api_base: String,
    country: String,
}

impl ClientBuilder {
    /// Override the API base URL (used by tests)
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn build(self) -> ITunesClient {
        ITunesClient {
            context: self.context,
            api_base: self.api_base,
            country: self.country,
        }
    }
}
