//! Résolution des flux SoundCloud
//!
//! Les URLs de flux sont signées et expirent ; elles sont gardées en cache
//! quelques minutes, et jamais au-delà de leur date d'expiration.

use crate::client::SoundCloudClient;
use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use sbsource::{
    CanonicalTrack, MediaResolver, Result, ServiceType, SourceError, StreamDescriptor, StreamKind,
    guarded,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Résout une piste SoundCloud vers un flux MP3 progressif ou, à défaut,
/// vers un manifeste HLS
#[derive(Clone)]
pub struct SoundCloudResolver {
    client: SoundCloudClient,
    /// Cache des URLs de streaming (TTL: 5 minutes)
    stream_urls: Arc<MokaCache<String, StreamDescriptor>>,
}

impl SoundCloudResolver {
    pub fn new(client: SoundCloudClient) -> Self {
        Self {
            client,
            stream_urls: Arc::new(
                MokaCache::builder()
                    .max_capacity(500)
                    .time_to_live(Duration::from_secs(300)) // 5 minutes
                    .build(),
            ),
        }
    }

    async fn fetch(&self, track: &CanonicalTrack) -> Result<StreamDescriptor> {
        let streams = self.client.streams(&track.id).await.map_err(|e| match e {
            SourceError::Backend {
                status: 401 | 403,
                message,
            } => {
                warn!(track = %track.key(), "stream access forbidden");
                SourceError::Backend {
                    status: 403,
                    message: format!("stream access forbidden: {}", message),
                }
            }
            other => other,
        })?;

        if let Some(url) = streams.http_mp3_128_url {
            return Ok(StreamDescriptor::new(
                url,
                StreamKind::Direct,
                Some("audio/mpeg".to_string()),
            ));
        }
        if let Some(url) = streams.hls_mp3_128_url.or(streams.hls_opus_64_url) {
            return Ok(StreamDescriptor::new(
                url,
                StreamKind::AdaptiveManifest,
                Some("application/vnd.apple.mpegurl".to_string()),
            ));
        }
        Err(SourceError::NotFound(format!(
            "no playable stream for track {}",
            track.id
        )))
    }
}

#[async_trait]
impl MediaResolver for SoundCloudResolver {
    async fn resolve(
        &self,
        track: &CanonicalTrack,
        cancel: &CancellationToken,
    ) -> Result<StreamDescriptor> {
        if track.service != ServiceType::SoundCloud {
            return Err(SourceError::Unsupported(format!(
                "{} track given to the SoundCloud resolver",
                track.service
            )));
        }
        if track.is_live {
            return Err(SourceError::Unsupported(
                "live playback is not available on SoundCloud".to_string(),
            ));
        }

        if let Some(cached) = self.stream_urls.get(&track.id).await {
            if !cached.is_expired() {
                debug!(track = %track.key(), "stream url served from cache");
                return Ok(cached);
            }
            self.stream_urls.invalidate(&track.id).await;
        }

        let descriptor = guarded(cancel, self.fetch(track)).await?;
        self.stream_urls
            .insert(track.id.clone(), descriptor.clone())
            .await;
        Ok(descriptor)
    }
}
