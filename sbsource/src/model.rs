//! Canonical, backend agnostic entities.
//!
//! Every adapter maps its raw payloads into these types through pure
//! functions. Entities reference each other by id; a track carries an
//! optional snapshot of its owner but users never point back at tracks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend a canonical entity comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    SoundCloud,
    YouTube,
    /// iTunes podcast directory
    ITunes,
}

impl ServiceType {
    /// Stable identifier, also used as configuration key (`services.<id>`)
    pub fn id(&self) -> &'static str {
        match self {
            ServiceType::SoundCloud => "soundcloud",
            ServiceType::YouTube => "youtube",
            ServiceType::ITunes => "itunes",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Identity of a track across the whole application
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackKey {
    pub service: ServiceType,
    pub id: String,
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.id)
    }
}

/// Denormalized snapshot of a user, held by the entities it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    #[default]
    Track,
    Episode,
    Other,
}

/// A playable item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTrack {
    pub id: String,
    pub service: ServiceType,
    #[serde(default)]
    pub kind: TrackKind,
    pub title: String,
    pub description: Option<String>,
    pub artwork_url: Option<String>,
    pub duration_ms: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub like_count: u64,
    pub view_count: u64,
    pub comment_count: u64,
    pub permalink: Option<String>,
    pub genre: Option<String>,
    pub is_live: bool,
    pub owner: Option<UserRef>,
}

impl CanonicalTrack {
    /// Minimal track, mostly useful for tests and stubs
    pub fn new(service: ServiceType, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service,
            kind: TrackKind::Track,
            title: title.into(),
            description: None,
            artwork_url: None,
            duration_ms: 0,
            created_at: None,
            like_count: 0,
            view_count: 0,
            comment_count: 0,
            permalink: None,
            genre: None,
            is_live: false,
            owner: None,
        }
    }

    pub fn key(&self) -> TrackKey {
        TrackKey {
            service: self.service,
            id: self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalUser {
    pub id: String,
    pub service: ServiceType,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub description: Option<String>,
    pub permalink: Option<String>,
    pub followers_count: u64,
    pub track_count: u64,
}

impl CanonicalUser {
    /// Snapshot to embed in owned entities
    pub fn to_user_ref(&self) -> UserRef {
        UserRef {
            id: self.id.clone(),
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPlaylist {
    pub id: String,
    pub service: ServiceType,
    pub title: String,
    pub description: Option<String>,
    pub artwork_url: Option<String>,
    pub track_count: u64,
    pub duration_ms: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub permalink: Option<String>,
    pub owner: Option<UserRef>,
    /// Ids of the tracks, when the backend returns them inline
    #[serde(default)]
    pub track_ids: Vec<String>,
}

/// A podcast show; its episodes live in the RSS feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPodcast {
    pub id: String,
    pub service: ServiceType,
    pub title: String,
    pub author: Option<String>,
    pub artwork_url: Option<String>,
    pub feed_url: Option<String>,
    pub genre: Option<String>,
    pub episode_count: u64,
    pub released_at: Option<DateTime<Utc>>,
    pub permalink: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalComment {
    pub id: String,
    pub service: ServiceType,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
    pub author: Option<UserRef>,
    pub track_id: String,
    /// Position in the track the comment is attached to, if any
    pub position_ms: Option<u64>,
}
