//! Podcast directory search.

use crate::client::ITunesClient;
use crate::mapping;
use async_trait::async_trait;
use sbsource::{
    CanonicalPodcast, ContentSource, PaginationToken, SourceResponse, TokenReset, guarded,
};
use tokio_util::sync::CancellationToken;

/// Podcasts matching a search term; the whole result is a single page
#[derive(Clone)]
pub struct PodcastSearchSource {
    client: ITunesClient,
    query: String,
    reset: TokenReset,
}

impl PodcastSearchSource {
    pub fn new(client: ITunesClient, query: impl Into<String>) -> Self {
        Self {
            client,
            query: query.into(),
            reset: TokenReset::default(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.reset.invalidate();
    }
}

#[async_trait]
impl ContentSource for PodcastSearchSource {
    type Item = CanonicalPodcast;

    fn name(&self) -> &str {
        "itunes:search:podcasts"
    }

    async fn fetch_page(
        &self,
        count_hint: u32,
        token: Option<&PaginationToken>,
        cancel: &CancellationToken,
    ) -> SourceResponse<CanonicalPodcast> {
        // a continuation can only be the "eol" closing the single page
        if self.reset.apply(token).is_some() || self.query.trim().is_empty() {
            return self.reset.settle(SourceResponse::end());
        }
        let response = guarded(cancel, self.client.search_podcasts(&self.query, count_hint)).await;
        let response = match response {
            Ok(found) => SourceResponse::page(
                found.results.into_iter().filter_map(mapping::podcast).collect(),
                PaginationToken::end(),
            ),
            Err(e) => SourceResponse::failed(&e),
        };
        self.reset.settle(response)
    }
}
