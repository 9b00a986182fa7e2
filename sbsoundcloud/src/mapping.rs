//! Pure conversions from SoundCloud payloads to canonical entities.

use crate::models::{ScComment, ScPlaylist, ScTrack, ScUser};
use chrono::{DateTime, NaiveDateTime, Utc};
use sbsource::{
    CanonicalComment, CanonicalPlaylist, CanonicalTrack, CanonicalUser, ServiceType, TrackKind,
    UserRef,
};

/// v2 uses RFC 3339, v1 `2017/05/12 14:00:32 +0000`
pub(crate) fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y/%m/%d %H:%M:%S %z"))
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|d| d.and_utc())
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

pub fn user_ref(user: &ScUser) -> UserRef {
    UserRef {
        id: user.id.clone(),
        username: user.username.clone(),
        avatar_url: non_empty(user.avatar_url.clone()),
    }
}

pub fn user(user: ScUser) -> CanonicalUser {
    CanonicalUser {
        id: user.id,
        service: ServiceType::SoundCloud,
        username: user.username,
        full_name: non_empty(user.full_name),
        avatar_url: non_empty(user.avatar_url),
        description: non_empty(user.description),
        permalink: user.permalink_url,
        followers_count: user.followers_count.unwrap_or_default(),
        track_count: user.track_count.unwrap_or_default(),
    }
}

/// Tracks without their own artwork show the uploader's avatar
pub fn track(track: ScTrack) -> CanonicalTrack {
    let owner = track.user.as_ref().map(user_ref);
    let artwork_url = non_empty(track.artwork_url)
        .or_else(|| owner.as_ref().and_then(|o| o.avatar_url.clone()));
    let kind = match track.kind.as_deref() {
        None | Some("track") => TrackKind::Track,
        Some(_) => TrackKind::Other,
    };

    CanonicalTrack {
        id: track.id,
        service: ServiceType::SoundCloud,
        kind,
        title: track.title,
        description: non_empty(track.description),
        artwork_url,
        duration_ms: track.duration.unwrap_or_default(),
        created_at: parse_date(track.created_at.as_deref()),
        like_count: track
            .likes_count
            .or(track.favoritings_count)
            .unwrap_or_default(),
        view_count: track.playback_count.unwrap_or_default(),
        comment_count: track.comment_count.unwrap_or_default(),
        permalink: track.permalink_url,
        genre: non_empty(track.genre),
        is_live: false,
        owner,
    }
}

pub fn playlist(playlist: ScPlaylist) -> CanonicalPlaylist {
    let owner = playlist.user.as_ref().map(user_ref);
    let artwork_url = non_empty(playlist.artwork_url)
        .or_else(|| playlist.tracks.iter().find_map(|t| non_empty(t.artwork_url.clone())))
        .or_else(|| owner.as_ref().and_then(|o| o.avatar_url.clone()));

    CanonicalPlaylist {
        id: playlist.id,
        service: ServiceType::SoundCloud,
        title: playlist.title,
        description: non_empty(playlist.description),
        artwork_url,
        track_count: playlist
            .track_count
            .unwrap_or(playlist.tracks.len() as u64),
        duration_ms: playlist.duration.unwrap_or_default(),
        created_at: parse_date(playlist.created_at.as_deref()),
        permalink: playlist.permalink_url,
        owner,
        track_ids: playlist.tracks.into_iter().map(|t| t.id).collect(),
    }
}

pub fn comment(comment: ScComment) -> CanonicalComment {
    CanonicalComment {
        id: comment.id,
        service: ServiceType::SoundCloud,
        body: comment.body,
        created_at: parse_date(comment.created_at.as_deref()),
        author: comment.user.as_ref().map(user_ref),
        track_id: comment.track_id,
        position_ms: comment.timestamp,
    }
}
