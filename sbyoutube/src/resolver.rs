//! YouTube stream resolution
//!
//! Regular videos resolve to the best audio-only format that carries a
//! plain URL. Live videos resolve to their HLS manifest. Formats that are
//! only reachable through a signature cipher are reported as unsupported.

use crate::client::YouTubeClient;
use crate::models::{PlayerResponse, StreamFormat};
use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use sbsource::{
    CanonicalTrack, MediaResolver, Result, ServiceType, SourceError, StreamDescriptor, StreamKind,
    guarded,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Clone)]
pub struct YouTubeResolver {
    client: YouTubeClient,
    /// Resolved streams (TTL: 5 minutes, never past the URL expiry)
    stream_urls: Arc<MokaCache<String, StreamDescriptor>>,
}

impl YouTubeResolver {
    pub fn new(client: YouTubeClient) -> Self {
        Self {
            client,
            stream_urls: Arc::new(
                MokaCache::builder()
                    .max_capacity(500)
                    .time_to_live(Duration::from_secs(300))
                    .build(),
            ),
        }
    }
}

/// Picks a stream out of a player response
pub fn select_stream(response: PlayerResponse, live_hint: bool) -> Result<StreamDescriptor> {
    let status = response.playability_status;
    if status.status != "OK" {
        let reason = status
            .reason
            .unwrap_or_else(|| format!("video is not playable ({})", status.status));
        return Err(match status.status.as_str() {
            "ERROR" => SourceError::NotFound(reason),
            _ => SourceError::Unsupported(reason),
        });
    }

    let is_live = live_hint || response.video_details.is_some_and(|d| d.is_live);
    let streaming = response
        .streaming_data
        .ok_or_else(|| SourceError::NotFound("no streaming data".to_string()))?;

    if is_live {
        return streaming
            .hls_manifest_url
            .map(|url| {
                StreamDescriptor::new(
                    url,
                    StreamKind::AdaptiveManifest,
                    Some("application/x-mpegURL".to_string()),
                )
            })
            .ok_or_else(|| SourceError::Unsupported("live video without HLS manifest".into()));
    }

    let audio: Vec<StreamFormat> = streaming
        .adaptive_formats
        .into_iter()
        .filter(StreamFormat::is_audio_only)
        .collect();

    let best = audio
        .iter()
        .filter(|f| f.url.is_some())
        .max_by_key(|f| f.bitrate);

    match best {
        Some(format) => {
            debug!(itag = format.itag, bitrate = format.bitrate, "selected audio format");
            let mime = format
                .mime_type
                .split(';')
                .next()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            let url = format.url.clone().unwrap_or_default();
            Ok(StreamDescriptor::new(url, StreamKind::Direct, mime))
        }
        None if audio.iter().any(|f| f.signature_cipher.is_some()) => Err(
            SourceError::Unsupported("audio streams require signature deciphering".to_string()),
        ),
        None => Err(SourceError::NotFound("no audio stream".to_string())),
    }
}

#[async_trait]
impl MediaResolver for YouTubeResolver {
    async fn resolve(
        &self,
        track: &CanonicalTrack,
        cancel: &CancellationToken,
    ) -> Result<StreamDescriptor> {
        if track.service != ServiceType::YouTube {
            return Err(SourceError::Unsupported(format!(
                "{} track given to the YouTube resolver",
                track.service
            )));
        }

        if let Some(cached) = self.stream_urls.get(&track.id).await {
            if !cached.is_expired() {
                return Ok(cached);
            }
            self.stream_urls.invalidate(&track.id).await;
        }

        let response = guarded(cancel, self.client.player(&track.id)).await?;
        let descriptor = select_stream(response, track.is_live)?;
        self.stream_urls
            .insert(track.id.clone(), descriptor.clone())
            .await;
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn player(value: serde_json::Value) -> PlayerResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_best_plain_audio_format_wins() {
        let response = player(json!({
            "playabilityStatus": { "status": "OK" },
            "streamingData": {
                "adaptiveFormats": [
                    { "itag": 137, "url": "https://v/video", "mimeType": "video/mp4; codecs=\"avc1\"", "bitrate": 4000000 },
                    { "itag": 140, "url": "https://v/aac?expire=1700000000", "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"", "bitrate": 130000 },
                    { "itag": 251, "url": "https://v/opus", "mimeType": "audio/webm; codecs=\"opus\"", "bitrate": 160000 },
                    { "itag": 250, "signatureCipher": "s=abc", "mimeType": "audio/webm; codecs=\"opus\"", "bitrate": 999999 }
                ]
            }
        }));
        let stream = select_stream(response, false).unwrap();
        assert_eq!(stream.url, "https://v/opus");
        assert_eq!(stream.kind, StreamKind::Direct);
        assert_eq!(stream.mime_type.as_deref(), Some("audio/webm"));
    }

    #[test]
    fn test_cipher_only_is_unsupported() {
        let response = player(json!({
            "playabilityStatus": { "status": "OK" },
            "streamingData": {
                "adaptiveFormats": [
                    { "itag": 251, "signatureCipher": "s=abc", "mimeType": "audio/webm", "bitrate": 1 }
                ]
            }
        }));
        assert!(matches!(
            select_stream(response, false),
            Err(SourceError::Unsupported(_))
        ));
    }

    #[test]
    fn test_live_uses_manifest() {
        let response = player(json!({
            "playabilityStatus": { "status": "OK" },
            "videoDetails": { "isLive": true },
            "streamingData": { "hlsManifestUrl": "https://manifest/index.m3u8" }
        }));
        let stream = select_stream(response, false).unwrap();
        assert_eq!(stream.kind, StreamKind::AdaptiveManifest);
        assert_eq!(stream.url, "https://manifest/index.m3u8");
    }

    #[test]
    fn test_playability_errors() {
        let removed = player(json!({
            "playabilityStatus": { "status": "ERROR", "reason": "Video unavailable" }
        }));
        assert_eq!(
            select_stream(removed, false),
            Err(SourceError::NotFound("Video unavailable".to_string()))
        );

        let login = player(json!({
            "playabilityStatus": { "status": "LOGIN_REQUIRED" }
        }));
        assert!(matches!(
            select_stream(login, false),
            Err(SourceError::Unsupported(_))
        ));
    }
}
