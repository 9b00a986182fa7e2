//! YouTube content sources

use crate::client::YouTubeClient;
use crate::mapping;
use crate::models::{YtCommentThread, YtSearchResult, YtVideo};
use async_trait::async_trait;
use sbsource::{
    CanonicalComment, CanonicalTrack, CanonicalUser, ContentSource, Page, PaginationToken, Result,
    SourceResponse, TokenReset, guarded,
};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Video search (`search?type=video`)
///
/// Search results carry neither durations nor counters; they are filled in
/// with one `videos` call per page. If that call fails the page is still
/// returned, without them.
#[derive(Clone)]
pub struct YouTubeTrackSearchSource {
    client: YouTubeClient,
    query: String,
    reset: TokenReset,
}

impl YouTubeTrackSearchSource {
    pub fn new(client: YouTubeClient, query: impl Into<String>) -> Self {
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

    async fn search(
        &self,
        count_hint: u32,
        token: Option<&PaginationToken>,
    ) -> Result<Page<CanonicalTrack>> {
        let page = self
            .client
            .list::<YtSearchResult>(
                "search",
                vec![
                    ("part", "snippet".to_string()),
                    ("type", "video".to_string()),
                    ("q", self.query.clone()),
                ],
                count_hint,
                token,
            )
            .await?
            .filter_map(mapping::track);

        let ids: Vec<String> = page.items.iter().map(|t| t.id.clone()).collect();
        let details: HashMap<String, YtVideo> = match self.client.videos(&ids).await {
            Ok(videos) => videos.into_iter().map(|v| (v.id.clone(), v)).collect(),
            Err(e) => {
                warn!("could not load video details: {}", e);
                HashMap::new()
            }
        };

        Ok(page.map(|mut track| {
            if let Some(video) = details.get(&track.id) {
                mapping::enrich(&mut track, video);
            }
            track
        }))
    }
}

#[async_trait]
impl ContentSource for YouTubeTrackSearchSource {
    type Item = CanonicalTrack;

    fn name(&self) -> &str {
        "youtube:search:videos"
    }

    async fn fetch_page(
        &self,
        count_hint: u32,
        token: Option<&PaginationToken>,
        cancel: &CancellationToken,
    ) -> SourceResponse<CanonicalTrack> {
        let token = self.reset.apply(token);
        if self.query.trim().is_empty() {
            return self.reset.settle(SourceResponse::end());
        }
        let page = guarded(cancel, self.search(count_hint, token)).await;
        self.reset.settle(page.into())
    }
}

/// Channel search (`search?type=channel`)
#[derive(Clone)]
pub struct YouTubeChannelSearchSource {
    client: YouTubeClient,
    query: String,
    reset: TokenReset,
}

impl YouTubeChannelSearchSource {
    pub fn new(client: YouTubeClient, query: impl Into<String>) -> Self {
        Self {
            client,
            query: query.into(),
            reset: TokenReset::default(),
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.reset.invalidate();
    }
}

#[async_trait]
impl ContentSource for YouTubeChannelSearchSource {
    type Item = CanonicalUser;

    fn name(&self) -> &str {
        "youtube:search:channels"
    }

    async fn fetch_page(
        &self,
        count_hint: u32,
        token: Option<&PaginationToken>,
        cancel: &CancellationToken,
    ) -> SourceResponse<CanonicalUser> {
        let token = self.reset.apply(token);
        if self.query.trim().is_empty() {
            return self.reset.settle(SourceResponse::end());
        }
        let page = guarded(
            cancel,
            self.client.list::<YtSearchResult>(
                "search",
                vec![
                    ("part", "snippet".to_string()),
                    ("type", "channel".to_string()),
                    ("q", self.query.clone()),
                ],
                count_hint,
                token,
            ),
        )
        .await;
        self.reset.settle(page.map(|p| p.filter_map(mapping::channel)).into())
    }
}

/// Top level comments of a video (`commentThreads`)
#[derive(Clone)]
pub struct YouTubeCommentSource {
    client: YouTubeClient,
    video_id: String,
    reset: TokenReset,
}

impl YouTubeCommentSource {
    pub fn new(client: YouTubeClient, video_id: impl Into<String>) -> Self {
        Self {
            client,
            video_id: video_id.into(),
            reset: TokenReset::default(),
        }
    }

    pub fn set_video_id(&mut self, video_id: impl Into<String>) {
        self.video_id = video_id.into();
        self.reset.invalidate();
    }
}

#[async_trait]
impl ContentSource for YouTubeCommentSource {
    type Item = CanonicalComment;

    fn name(&self) -> &str {
        "youtube:video:comments"
    }

    async fn fetch_page(
        &self,
        count_hint: u32,
        token: Option<&PaginationToken>,
        cancel: &CancellationToken,
    ) -> SourceResponse<CanonicalComment> {
        let token = self.reset.apply(token);
        let page = guarded(
            cancel,
            self.client.list::<YtCommentThread>(
                "commentThreads",
                vec![
                    ("part", "snippet".to_string()),
                    ("videoId", self.video_id.clone()),
                    ("textFormat", "plainText".to_string()),
                ],
                count_hint,
                token,
            ),
        )
        .await;
        self.reset.settle(page.map(|p| p.map(mapping::comment)).into())
    }
}
