//! SoundCloud content sources, one per listing kind.
//!
//! Each source only holds its filter. Every filter setter invalidates the
//! continuation token the caller may still hold.

use crate::client::{Api, SoundCloudClient};
use crate::mapping;
use crate::models::{ScChartItem, ScComment, ScLikeItem, ScPlaylist, ScTrack, ScUser};
use async_trait::async_trait;
use sbsource::{
    CanonicalComment, CanonicalPlaylist, CanonicalTrack, CanonicalUser, ContentSource,
    PaginationToken, SourceResponse, TokenReset, guarded,
};
use tokio_util::sync::CancellationToken;

/// SoundCloud refuses search pages smaller than this
const MIN_SEARCH_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 200;

fn limit(count_hint: u32) -> u32 {
    count_hint.clamp(1, MAX_LIMIT)
}

/// Full text search over tracks (`/tracks?q=`)
#[derive(Clone)]
pub struct SoundCloudTrackSearchSource {
    client: SoundCloudClient,
    query: String,
    reset: TokenReset,
}

impl SoundCloudTrackSearchSource {
    pub fn new(client: SoundCloudClient, query: impl Into<String>) -> Self {
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
impl ContentSource for SoundCloudTrackSearchSource {
    type Item = CanonicalTrack;

    fn name(&self) -> &str {
        "soundcloud:search:tracks"
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
        let page = guarded(
            cancel,
            self.client.collection::<ScTrack>(
                Api::V1,
                "/tracks",
                vec![("q", self.query.clone())],
                limit(count_hint).max(MIN_SEARCH_LIMIT),
                token,
                "offset",
            ),
        )
        .await;
        self.reset.settle(page.map(|p| p.map(mapping::track)).into())
    }
}

/// Chart flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Top,
    Trending,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Top => "top",
            ChartKind::Trending => "trending",
        }
    }
}

/// Charts per genre (`/charts`, API v2)
#[derive(Clone)]
pub struct SoundCloudChartSource {
    client: SoundCloudClient,
    genre: String,
    kind: ChartKind,
    reset: TokenReset,
}

impl SoundCloudChartSource {
    /// `genre` is the short genre name (`all-music`, `electronic`...)
    pub fn new(client: SoundCloudClient, genre: impl Into<String>, kind: ChartKind) -> Self {
        Self {
            client,
            genre: genre.into(),
            kind,
            reset: TokenReset::default(),
        }
    }

    pub fn set_genre(&mut self, genre: impl Into<String>) {
        self.genre = genre.into();
        self.reset.invalidate();
    }

    pub fn set_kind(&mut self, kind: ChartKind) {
        self.kind = kind;
        self.reset.invalidate();
    }

    fn genre_param(&self) -> String {
        let genre = self.genre.trim();
        let genre = if genre.is_empty() { "all-music" } else { genre };
        format!("soundcloud:genres:{}", genre)
    }
}

#[async_trait]
impl ContentSource for SoundCloudChartSource {
    type Item = CanonicalTrack;

    fn name(&self) -> &str {
        "soundcloud:charts"
    }

    async fn fetch_page(
        &self,
        count_hint: u32,
        token: Option<&PaginationToken>,
        cancel: &CancellationToken,
    ) -> SourceResponse<CanonicalTrack> {
        let token = self.reset.apply(token);
        let page = guarded(
            cancel,
            self.client.collection::<ScChartItem>(
                Api::V2,
                "/charts",
                vec![
                    ("kind", self.kind.as_str().to_string()),
                    ("genre", self.genre_param()),
                ],
                limit(count_hint),
                token,
                "offset",
            ),
        )
        .await;
        self.reset.settle(page.map(|p| p.map(|item| mapping::track(item.track))).into())
    }
}

/// Tracks a user liked (`/users/{id}/track_likes`, API v2, cursor based)
#[derive(Clone)]
pub struct SoundCloudUserLikesSource {
    client: SoundCloudClient,
    user_id: String,
    reset: TokenReset,
}

impl SoundCloudUserLikesSource {
    pub fn new(client: SoundCloudClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            reset: TokenReset::default(),
        }
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = user_id.into();
        self.reset.invalidate();
    }
}

#[async_trait]
impl ContentSource for SoundCloudUserLikesSource {
    type Item = CanonicalTrack;

    fn name(&self) -> &str {
        "soundcloud:user:likes"
    }

    async fn fetch_page(
        &self,
        count_hint: u32,
        token: Option<&PaginationToken>,
        cancel: &CancellationToken,
    ) -> SourceResponse<CanonicalTrack> {
        let token = self.reset.apply(token);
        let page = guarded(
            cancel,
            self.client.collection::<ScLikeItem>(
                Api::V2,
                &format!("/users/{}/track_likes", self.user_id),
                Vec::new(),
                limit(count_hint),
                token,
                "cursor",
            ),
        )
        .await;
        // likes on deleted tracks come back without a track
        self.reset
            .settle(page.map(|p| p.filter_map(|like| like.track.map(mapping::track))).into())
    }
}

/// Comments of a track (`/tracks/{id}/comments`)
#[derive(Clone)]
pub struct SoundCloudCommentSource {
    client: SoundCloudClient,
    track_id: String,
    reset: TokenReset,
}

impl SoundCloudCommentSource {
    pub fn new(client: SoundCloudClient, track_id: impl Into<String>) -> Self {
        Self {
            client,
            track_id: track_id.into(),
            reset: TokenReset::default(),
        }
    }

    pub fn set_track_id(&mut self, track_id: impl Into<String>) {
        self.track_id = track_id.into();
        self.reset.invalidate();
    }
}

#[async_trait]
impl ContentSource for SoundCloudCommentSource {
    type Item = CanonicalComment;

    fn name(&self) -> &str {
        "soundcloud:track:comments"
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
            self.client.collection::<ScComment>(
                Api::V1,
                &format!("/tracks/{}/comments", self.track_id),
                Vec::new(),
                limit(count_hint),
                token,
                "offset",
            ),
        )
        .await;
        self.reset.settle(page.map(|p| p.map(mapping::comment)).into())
    }
}

/// Full text search over users (`/users?q=`)
#[derive(Clone)]
pub struct SoundCloudUserSearchSource {
    client: SoundCloudClient,
    query: String,
    reset: TokenReset,
}

impl SoundCloudUserSearchSource {
    pub fn new(client: SoundCloudClient, query: impl Into<String>) -> Self {
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
impl ContentSource for SoundCloudUserSearchSource {
    type Item = CanonicalUser;

    fn name(&self) -> &str {
        "soundcloud:search:users"
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
            self.client.collection::<ScUser>(
                Api::V1,
                "/users",
                vec![("q", self.query.clone())],
                limit(count_hint).max(MIN_SEARCH_LIMIT),
                token,
                "offset",
            ),
        )
        .await;
        self.reset.settle(page.map(|p| p.map(mapping::user)).into())
    }
}

/// Playlists published by a user (`/users/{id}/playlists`)
#[derive(Clone)]
pub struct SoundCloudUserPlaylistSource {
    client: SoundCloudClient,
    user_id: String,
    reset: TokenReset,
}

impl SoundCloudUserPlaylistSource {
    pub fn new(client: SoundCloudClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            reset: TokenReset::default(),
        }
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = user_id.into();
        self.reset.invalidate();
    }
}

#[async_trait]
impl ContentSource for SoundCloudUserPlaylistSource {
    type Item = CanonicalPlaylist;

    fn name(&self) -> &str {
        "soundcloud:user:playlists"
    }

    async fn fetch_page(
        &self,
        count_hint: u32,
        token: Option<&PaginationToken>,
        cancel: &CancellationToken,
    ) -> SourceResponse<CanonicalPlaylist> {
        let token = self.reset.apply(token);
        let page = guarded(
            cancel,
            self.client.collection::<ScPlaylist>(
                Api::V1,
                &format!("/users/{}/playlists", self.user_id),
                Vec::new(),
                limit(count_hint),
                token,
                "offset",
            ),
        )
        .await;
        self.reset.settle(page.map(|p| p.map(mapping::playlist)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        assert_eq!(limit(0), 1);
        assert_eq!(limit(500), MAX_LIMIT);
        assert_eq!(limit(3).max(MIN_SEARCH_LIMIT), 10);
    }

    #[test]
    fn test_chart_genre_param() {
        let context = sbsource::ServiceContext::new(
            sbsource::HttpTransport::new(std::time::Duration::from_secs(1), "test").unwrap(),
            std::sync::Arc::new(sbsource::StaticAuthStore::new()),
        );
        let client = SoundCloudClient::builder(context).build();
        let mut source = SoundCloudChartSource::new(client, "", ChartKind::Trending);
        assert_eq!(source.genre_param(), "soundcloud:genres:all-music");
        source.set_genre("electronic");
        assert_eq!(source.genre_param(), "soundcloud:genres:electronic");
    }
}
