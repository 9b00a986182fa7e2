//! HTTP client for the YouTube Data API v3 and the player endpoint
//!
//! The client only builds requests and decodes the `nextPageToken`
//! envelope; it keeps no pagination state.

use crate::config_ext::YouTubeConfigExt;
use crate::models::{PlayerResponse, YtListResponse, YtVideo};
use sbconfig::Config;
use sbsource::{Page, PaginationToken, Result, ServiceContext, ServiceType};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// Default Data API base URL
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Default player endpoint base URL
pub const DEFAULT_PLAYER_BASE: &str = "https://www.youtube.com/youtubei/v1";

/// Largest page the Data API accepts
pub const MAX_RESULTS: u32 = 50;

/// Client context sent to the player endpoint
const PLAYER_CLIENT_NAME: &str = "ANDROID";
const PLAYER_CLIENT_VERSION: &str = "19.09.37";

/// YouTube client shared by the sources and the resolver
#[derive(Clone)]
pub struct YouTubeClient {
    context: ServiceContext,
    api_key: Option<String>,
    api_base: String,
    player_base: String,
}

impl YouTubeClient {
    /// Create a builder for configuring the client
    pub fn builder(context: ServiceContext) -> ClientBuilder {
        ClientBuilder {
            context,
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            player_base: DEFAULT_PLAYER_BASE.to_string(),
        }
    }

    /// Create a client from `services.youtube.*`
    pub fn from_config(context: ServiceContext, config: &Config) -> Self {
        let mut builder = Self::builder(context)
            .api_base(config.get_youtube_api_base())
            .player_base(config.get_youtube_player_base());
        if let Some(key) = config.get_youtube_api_key() {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    fn with_key(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        params
    }

    /// GET a Data API resource
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<T> {
        let url = format!("{}/{}", self.api_base, resource);
        let params = self.with_key(params);
        let token = self.context.token(ServiceType::YouTube);
        self.context
            .transport
            .get_json(&url, &params, token.as_deref())
            .await
    }

    /// Fetch one page of a Data API listing
    pub(crate) async fn list<R: DeserializeOwned>(
        &self,
        resource: &str,
        mut params: Vec<(&'static str, String)>,
        count_hint: u32,
        token: Option<&PaginationToken>,
    ) -> Result<Page<R>> {
        if token.is_some_and(PaginationToken::is_end) {
            return Ok(Page::end());
        }

        params.push(("maxResults", count_hint.clamp(1, MAX_RESULTS).to_string()));
        if let Some(token) = token {
            params.push(("pageToken", token.to_string()));
        }

        let envelope: YtListResponse<R> = self.get(resource, params).await?;
        let next = PaginationToken::next_or_end(envelope.next_page_token);
        debug!(resource, items = envelope.items.len(), next = %next, "youtube page");
        Ok(Page {
            items: envelope.items,
            next,
        })
    }

    /// Details (duration, statistics) for a batch of video ids
    pub(crate) async fn videos(&self, ids: &[String]) -> Result<Vec<YtVideo>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let envelope: YtListResponse<YtVideo> = self
            .get(
                "videos",
                vec![
                    ("part", "contentDetails,statistics".to_string()),
                    ("id", ids.join(",")),
                ],
            )
            .await?;
        Ok(envelope.items)
    }

    /// Ask the player endpoint for the streaming data of a video
    pub(crate) async fn player(&self, video_id: &str) -> Result<PlayerResponse> {
        let url = format!("{}/player", self.player_base);
        let body = json!({
            "videoId": video_id,
            "context": {
                "client": {
                    "clientName": PLAYER_CLIENT_NAME,
                    "clientVersion": PLAYER_CLIENT_VERSION,
                }
            }
        });
        let params = self.with_key(Vec::new());
        self.context
            .transport
            .post_json(&url, &params, &body, None)
            .await
    }
}

/// Builder for [`YouTubeClient`]
pub struct ClientBuilder {
    context: ServiceContext,
    api_key: Option<String>,
    api_base: String,
    player_base: String,
}

impl ClientBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the Data API base URL (useful for tests)
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the player endpoint base URL (useful for tests)
    pub fn player_base(mut self, player_base: impl Into<String>) -> Self {
        self.player_base = player_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn build(self) -> YouTubeClient {
        YouTubeClient {
            context: self.context,
            api_key: self.api_key,
            api_base: self.api_base,
            player_base: self.player_base,
        }
    }
}
