//! iTunes payloads to canonical podcasts.

use crate::models::ItunesPodcast;
use chrono::{DateTime, Utc};
use sbsource::{CanonicalPodcast, ServiceType};

/// Results without a collection id or name are not shows and are dropped
pub fn podcast(result: ItunesPodcast) -> Option<CanonicalPodcast> {
    let id = result.collection_id?;
    let title = result.collection_name.filter(|n| !n.trim().is_empty())?;
    Some(CanonicalPodcast {
        id: id.to_string(),
        service: ServiceType::ITunes,
        title,
        author: result.artist_name,
        artwork_url: result.artwork_url600.or(result.artwork_url100),
        feed_url: result.feed_url,
        genre: result.primary_genre_name,
        episode_count: result.track_count.unwrap_or_default(),
        released_at: result
            .release_date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc)),
        permalink: result.collection_view_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> ItunesPodcast {
        ItunesPodcast {
            collection_id: Some(1001),
            collection_name: Some("Rustacean Station".into()),
            artist_name: Some("Community".into()),
            feed_url: Some("https://feeds.example/rust.xml".into()),
            artwork_url600: None,
            artwork_url100: Some("https://img.example/100.jpg".into()),
            primary_genre_name: Some("Technology".into()),
            track_count: Some(150),
            release_date: Some("2024-05-01T12:00:00Z".into()),
            collection_view_url: None,
        }
    }

    #[test]
    fn test_podcast_mapping() {
        let mapped = podcast(result()).unwrap();
        assert_eq!(mapped.id, "1001");
        assert_eq!(mapped.service, ServiceType::ITunes);
        assert_eq!(mapped.artwork_url.as_deref(), Some("https://img.example/100.jpg"));
        assert_eq!(mapped.episode_count, 150);
        assert_eq!(
            mapped.released_at.map(|d| d.to_rfc3339()),
            Some("2024-05-01T12:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_results_without_identity_are_dropped() {
        let mut anonymous = result();
        anonymous.collection_id = None;
        assert!(podcast(anonymous).is_none());

        let mut untitled = result();
        untitled.collection_name = Some("  ".into());
        assert!(podcast(untitled).is_none());
    }
}
