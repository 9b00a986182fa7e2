//! Pure conversions from YouTube payloads to canonical entities.

use crate::models::{YtCommentThread, YtSearchResult, YtVideo};
use chrono::{DateTime, Utc};
use sbsource::{CanonicalComment, CanonicalTrack, CanonicalUser, ServiceType, TrackKind, UserRef};

pub const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
pub const CHANNEL_URL: &str = "https://www.youtube.com/channel/";

fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value?)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn parse_count(value: Option<&String>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or_default()
}

/// Parses an ISO 8601 duration (`P1DT2H3M4.5S`) into milliseconds.
///
/// Year and month designators are rejected: their length is ambiguous.
pub fn parse_iso8601_duration(value: &str) -> Option<u64> {
    let rest = value.strip_prefix('P')?;
    let mut total_ms: f64 = 0.0;
    let mut number = String::new();
    let mut in_time = false;
    let mut seen_any = false;

    for c in rest.chars() {
        match c {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' | '.' | ',' => number.push(if c == ',' { '.' } else { c }),
            designator => {
                let amount: f64 = number.parse().ok()?;
                number.clear();
                let unit_ms = match (in_time, designator) {
                    (false, 'W') => 7.0 * 86_400_000.0,
                    (false, 'D') => 86_400_000.0,
                    (true, 'H') => 3_600_000.0,
                    (true, 'M') => 60_000.0,
                    (true, 'S') => 1_000.0,
                    _ => return None,
                };
                total_ms += amount * unit_ms;
                seen_any = true;
            }
        }
    }

    if !number.is_empty() || !seen_any {
        return None;
    }
    Some(total_ms.round() as u64)
}

/// Video search result to canonical track; other result kinds are dropped
pub fn track(result: YtSearchResult) -> Option<CanonicalTrack> {
    if result.id.kind != "youtube#video" {
        return None;
    }
    let id = result.id.video_id?;
    let snippet = result.snippet;
    let is_live = snippet
        .live_broadcast_content
        .as_deref()
        .is_some_and(|c| c != "none");

    let owner = snippet.channel_id.map(|channel_id| UserRef {
        id: channel_id,
        username: snippet.channel_title.clone().unwrap_or_default(),
        avatar_url: None,
    });

    Some(CanonicalTrack {
        permalink: Some(format!("{}{}", WATCH_URL, id)),
        id,
        service: ServiceType::YouTube,
        kind: TrackKind::Track,
        title: snippet.title,
        description: snippet.description.filter(|d| !d.trim().is_empty()),
        artwork_url: snippet.thumbnails.best(),
        duration_ms: 0,
        created_at: parse_date(snippet.published_at.as_deref()),
        like_count: 0,
        view_count: 0,
        comment_count: 0,
        genre: Some("YouTube".to_string()),
        is_live,
        owner,
    })
}

/// Fills in duration and counters from a `videos` item
pub fn enrich(track: &mut CanonicalTrack, video: &YtVideo) {
    if let Some(duration) = video
        .content_details
        .as_ref()
        .and_then(|d| d.duration.as_deref())
        .and_then(parse_iso8601_duration)
    {
        track.duration_ms = duration;
    }
    if let Some(stats) = &video.statistics {
        track.view_count = parse_count(stats.view_count.as_ref());
        track.like_count = parse_count(stats.like_count.as_ref());
        track.comment_count = parse_count(stats.comment_count.as_ref());
    }
}

/// Channel search result to canonical user
pub fn channel(result: YtSearchResult) -> Option<CanonicalUser> {
    if result.id.kind != "youtube#channel" {
        return None;
    }
    let id = result.id.channel_id?;
    let snippet = result.snippet;
    Some(CanonicalUser {
        permalink: Some(format!("{}{}", CHANNEL_URL, id)),
        id,
        service: ServiceType::YouTube,
        username: snippet.channel_title.unwrap_or_else(|| snippet.title.clone()),
        full_name: Some(snippet.title),
        avatar_url: snippet.thumbnails.best(),
        description: snippet.description.filter(|d| !d.trim().is_empty()),
        followers_count: 0,
        track_count: 0,
    })
}

pub fn comment(thread: YtCommentThread) -> CanonicalComment {
    let top = thread.snippet.top_level_comment;
    let snippet = top.snippet;
    let author = snippet.author_channel_id.map(|channel| UserRef {
        id: channel.value,
        username: snippet.author_display_name.clone(),
        avatar_url: snippet.author_profile_image_url.clone(),
    });

    CanonicalComment {
        id: top.id,
        service: ServiceType::YouTube,
        body: snippet.text_original.unwrap_or(snippet.text_display),
        created_at: parse_date(snippet.published_at.as_deref()),
        author,
        track_id: thread.snippet.video_id,
        position_ms: None,
    }
}
