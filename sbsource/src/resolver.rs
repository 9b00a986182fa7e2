//! Media resolution: turning a canonical track into something playable.

use crate::error::{Result, SourceError};
use crate::model::{CanonicalTrack, ServiceType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    /// Progressive stream, playable as is
    Direct,
    /// HLS/DASH manifest, used for live content
    AdaptiveManifest,
}

/// Time bounded reference to a playable stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub url: String,
    pub kind: StreamKind,
    pub mime_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StreamDescriptor {
    /// Builds a descriptor, reading the expiry from the URL when it
    /// carries one
    pub fn new(url: impl Into<String>, kind: StreamKind, mime_type: Option<String>) -> Self {
        let url = url.into();
        let expires_at = expiry_from_url(&url);
        Self {
            url,
            kind,
            mime_type,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Unix timestamp from an `expire` (YouTube) or `Expires` (signed CDN)
/// query parameter
fn expiry_from_url(url: &str) -> Option<DateTime<Utc>> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "expire" || k == "Expires")
        .and_then(|(_, v)| v.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Resolves a playable stream for a track.
///
/// Calling it twice for the same track is harmless; caching the result is
/// up to the implementation.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(
        &self,
        track: &CanonicalTrack,
        cancel: &CancellationToken,
    ) -> Result<StreamDescriptor>;
}

/// Dispatches to one resolver per service
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<ServiceType, Arc<dyn MediaResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, service: ServiceType, resolver: Arc<dyn MediaResolver>) {
        self.resolvers.insert(service, resolver);
    }

    pub fn with(mut self, service: ServiceType, resolver: Arc<dyn MediaResolver>) -> Self {
        self.register(service, resolver);
        self
    }

    pub fn supports(&self, service: ServiceType) -> bool {
        self.resolvers.contains_key(&service)
    }
}

#[async_trait]
impl MediaResolver for ResolverRegistry {
    async fn resolve(
        &self,
        track: &CanonicalTrack,
        cancel: &CancellationToken,
    ) -> Result<StreamDescriptor> {
        let resolver = self.resolvers.get(&track.service).ok_or_else(|| {
            SourceError::Unsupported(format!("no resolver for service {}", track.service))
        })?;
        debug!(track = %track.key(), live = track.is_live, "resolving stream");
        resolver.resolve(track, cancel).await
    }
}
