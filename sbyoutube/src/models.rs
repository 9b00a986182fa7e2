//! Data models for the YouTube Data API v3 and the player endpoint
//!
//! These mirror the JSON payloads; conversion to canonical entities lives
//! in [`crate::mapping`].

use serde::Deserialize;

/// Page-token envelope shared by every Data API listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YtListResponse<T> {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YtThumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YtThumbnails {
    #[serde(default)]
    pub default: Option<YtThumbnail>,
    #[serde(default)]
    pub medium: Option<YtThumbnail>,
    #[serde(default)]
    pub high: Option<YtThumbnail>,
}

impl YtThumbnails {
    /// Largest available thumbnail
    pub fn best(&self) -> Option<String> {
        self.high
            .as_ref()
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
    }
}

/// `id` of a search result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YtResourceId {
    pub kind: String,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub playlist_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YtSnippet {
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnails: YtThumbnails,
    #[serde(default)]
    pub channel_title: Option<String>,
    /// `none`, `live` or `upcoming`
    #[serde(default)]
    pub live_broadcast_content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YtSearchResult {
    pub id: YtResourceId,
    #[serde(default)]
    pub snippet: YtSnippet,
}

/// Item of the `videos` endpoint, used to fill in durations and counters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YtVideo {
    pub id: String,
    #[serde(default)]
    pub content_details: Option<YtContentDetails>,
    #[serde(default)]
    pub statistics: Option<YtStatistics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YtContentDetails {
    /// ISO 8601 duration (`PT4M13S`)
    #[serde(default)]
    pub duration: Option<String>,
}

/// Counters are sent as strings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YtStatistics {
    #[serde(default)]
    pub view_count: Option<String>,
    #[serde(default)]
    pub like_count: Option<String>,
    #[serde(default)]
    pub comment_count: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YtCommentThread {
    pub id: String,
    pub snippet: YtCommentThreadSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YtCommentThreadSnippet {
    #[serde(default)]
    pub video_id: String,
    pub top_level_comment: YtComment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YtComment {
    pub id: String,
    pub snippet: YtCommentSnippet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YtCommentSnippet {
    #[serde(default)]
    pub author_display_name: String,
    #[serde(default)]
    pub author_profile_image_url: Option<String>,
    #[serde(default)]
    pub author_channel_id: Option<YtChannelRef>,
    #[serde(default)]
    pub text_display: String,
    #[serde(default)]
    pub text_original: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YtChannelRef {
    pub value: String,
}

/// Answer of the player endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub playability_status: PlayabilityStatus,
    #[serde(default)]
    pub streaming_data: Option<StreamingData>,
    #[serde(default)]
    pub video_details: Option<VideoDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayabilityStatus {
    /// `OK`, `ERROR`, `UNPLAYABLE`, `LOGIN_REQUIRED`...
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    #[serde(default)]
    pub hls_manifest_url: Option<String>,
    #[serde(default)]
    pub formats: Vec<StreamFormat>,
    #[serde(default)]
    pub adaptive_formats: Vec<StreamFormat>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFormat {
    pub itag: u32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub signature_cipher: Option<String>,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub bitrate: u64,
}

impl StreamFormat {
    pub fn is_audio_only(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub is_live_content: bool,
}
