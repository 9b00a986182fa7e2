//! Integration tests for sbsoundcloud

use sbsource::{
    CanonicalTrack, ContentSource, HttpTransport, IncrementalCollection, LoadOutcome,
    MediaResolver, PaginationToken, ServiceContext, ServiceType, SourceError, StaticAuthStore,
    StreamKind,
};
use sbsoundcloud::{
    ChartKind, SoundCloudChartSource, SoundCloudClient, SoundCloudCommentSource,
    SoundCloudResolver, SoundCloudTrackSearchSource, SoundCloudUserLikesSource,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(mock_server: &MockServer) -> SoundCloudClient {
    let context = ServiceContext::new(
        HttpTransport::new(Duration::from_secs(5), "sbsoundcloud-tests").unwrap(),
        Arc::new(StaticAuthStore::new().with_token(ServiceType::SoundCloud, "oauth-token")),
    );
    SoundCloudClient::builder(context)
        .client_id("test-client")
        .api_base(mock_server.uri())
        .api_v2_base(format!("{}/v2", mock_server.uri()))
        .build()
}

/// Create a mock track JSON
fn mock_track(id: u64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "kind": "track",
        "title": title,
        "duration": 180000,
        "created_at": "2018/03/01 12:00:00 +0000",
        "playback_count": 10,
        "likes_count": 2,
        "permalink_url": format!("https://soundcloud.com/artist/{}", id),
        "user": { "id": 99, "username": "artist", "avatar_url": "https://i1.sndcdn.com/a.jpg" }
    })
}

#[tokio::test]
async fn test_track_search_pages_through_offsets() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tracks"))
        .and(query_param("q", "lofi"))
        .and(query_param("limit", "10"))
        .and(query_param("linked_partitioning", "1"))
        .and(query_param("client_id", "test-client"))
        .and(query_param_is_missing("offset"))
        .and(header("authorization", "Bearer oauth-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [mock_track(1, "One"), mock_track(2, "Two")],
            "next_href": format!("{}/tracks?q=lofi&limit=10&offset=10", mock_server.uri())
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tracks"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [mock_track(3, "Three")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = SoundCloudTrackSearchSource::new(client_for(&mock_server), "lofi");
    let collection = IncrementalCollection::new(source);

    // search pages are never smaller than 10
    assert_eq!(collection.load_more(2).await, LoadOutcome::Appended(2));
    assert_eq!(collection.token(), Some(PaginationToken::new("10")));
    assert_eq!(collection.load_more(2).await, LoadOutcome::Appended(1));
    assert!(!collection.has_more());

    let titles: Vec<_> = collection.items().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["One", "Two", "Three"]);
}

#[tokio::test]
async fn test_empty_query_is_an_empty_terminal_page() {
    let mock_server = MockServer::start().await;

    let source = SoundCloudTrackSearchSource::new(client_for(&mock_server), "  ");
    let response = source
        .fetch_page(20, None, &CancellationToken::new())
        .await;

    assert!(response.is_success());
    assert!(response.items.is_empty());
    assert!(response.next_token.unwrap().is_end());
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_query_change_restarts_from_first_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tracks"))
        .and(query_param("q", "jazz"))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [mock_track(5, "Jazz")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut source = SoundCloudTrackSearchSource::new(client_for(&mock_server), "lofi");
    source.set_query("jazz");

    // a stale token from the previous query is ignored
    let stale = PaginationToken::new("40");
    let response = source
        .fetch_page(10, Some(&stale), &CancellationToken::new())
        .await;
    assert!(response.is_success());
    assert_eq!(response.items[0].title, "Jazz");
}

#[tokio::test]
async fn test_query_change_survives_a_failed_first_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tracks"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tracks"))
        .and(query_param("q", "new"))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [mock_track(7, "New")],
            "next_href": format!("{}/tracks?q=new&offset=10", mock_server.uri())
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tracks"))
        .and(query_param("q", "new"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [mock_track(8, "Newer")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut source = SoundCloudTrackSearchSource::new(client_for(&mock_server), "old");
    source.set_query("new");

    // the caller retries with the token it held for the old query
    let stale = PaginationToken::new("40");
    let cancel = CancellationToken::new();
    let failed = source.fetch_page(10, Some(&stale), &cancel).await;
    assert!(!failed.is_success());
    assert!(failed.next_token.is_none());

    let retried = source.fetch_page(10, Some(&stale), &cancel).await;
    assert!(retried.is_success());
    assert_eq!(retried.items[0].title, "New");
    let next = retried.next_token.unwrap();
    assert_eq!(next, PaginationToken::new("10"));

    // once a first page landed, tokens are honoured again
    let following = source.fetch_page(10, Some(&next), &cancel).await;
    assert_eq!(following.items[0].title, "Newer");

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert!(
        requests
            .iter()
            .all(|r| !r.url.query().unwrap_or("").contains("offset=40"))
    );
}

#[tokio::test]
async fn test_backend_failure_is_reported_not_raised() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tracks"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let collection = IncrementalCollection::new(SoundCloudTrackSearchSource::new(
        client_for(&mock_server),
        "lofi",
    ));

    match collection.load_more(10).await {
        LoadOutcome::Failed(failure) => {
            assert_eq!(failure.title, "Service unavailable");
            assert!(failure.kind.is_transient());
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(collection.is_empty());
    assert!(collection.has_more());
}

#[tokio::test]
async fn test_user_likes_follow_the_cursor_and_skip_removed_tracks() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/users/99/track_likes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [
                { "created_at": "2019-01-01T00:00:00Z", "track": mock_track(1, "Kept") },
                { "created_at": "2019-01-02T00:00:00Z", "track": null }
            ],
            "next_href": format!("{}/v2/users/99/track_likes?cursor=abc%3A123&limit=2", mock_server.uri())
        })))
        .mount(&mock_server)
        .await;

    let source = SoundCloudUserLikesSource::new(client_for(&mock_server), "99");
    let response = source.fetch_page(2, None, &CancellationToken::new()).await;

    assert!(response.is_success());
    assert_eq!(response.items.len(), 1);
    assert_eq!(response.items[0].title, "Kept");
    assert_eq!(response.next_token, Some(PaginationToken::new("abc:123")));
}

#[tokio::test]
async fn test_charts_unwrap_tracks() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/charts"))
        .and(query_param("kind", "trending"))
        .and(query_param("genre", "soundcloud:genres:electronic"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [{ "score": 12.5, "track": mock_track(7, "Charting") }],
            "next_href": null
        })))
        .mount(&mock_server)
        .await;

    let source =
        SoundCloudChartSource::new(client_for(&mock_server), "electronic", ChartKind::Trending);
    let response = source.fetch_page(20, None, &CancellationToken::new()).await;

    assert_eq!(response.items.len(), 1);
    assert_eq!(response.items[0].id, "7");
    assert!(response.next_token.unwrap().is_end());
}

#[tokio::test]
async fn test_comments_keep_track_position() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tracks/7/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [{
                "id": 1,
                "body": "great drop",
                "created_at": "2018/03/01 12:00:00 +0000",
                "track_id": 7,
                "timestamp": 61000,
                "user": { "id": 3, "username": "fan" }
            }]
        })))
        .mount(&mock_server)
        .await;

    let source = SoundCloudCommentSource::new(client_for(&mock_server), "7");
    let response = source.fetch_page(10, None, &CancellationToken::new()).await;

    let comment = &response.items[0];
    assert_eq!(comment.body, "great drop");
    assert_eq!(comment.track_id, "7");
    assert_eq!(comment.position_ms, Some(61000));
    assert_eq!(comment.author.as_ref().unwrap().username, "fan");
}

#[tokio::test]
async fn test_cancelled_fetch_is_distinguishable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tracks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "collection": [] }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let source = SoundCloudTrackSearchSource::new(client_for(&mock_server), "slow");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let response = source.fetch_page(10, None, &cancel).await;
    assert!(response.is_cancelled());
    assert!(response.failure().is_none());
}

#[tokio::test]
async fn test_resolver_prefers_progressive_mp3_and_caches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tracks/42/streams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "http_mp3_128_url": "https://cf-media.sndcdn.com/42.128.mp3?Policy=x&Expires=4102444800",
            "hls_mp3_128_url": "https://cf-hls-media.sndcdn.com/playlist/42.m3u8"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = SoundCloudResolver::new(client_for(&mock_server));
    let track = CanonicalTrack::new(ServiceType::SoundCloud, "42", "Night Drive");
    let cancel = CancellationToken::new();

    let first = resolver.resolve(&track, &cancel).await.unwrap();
    assert_eq!(first.kind, StreamKind::Direct);
    assert_eq!(first.mime_type.as_deref(), Some("audio/mpeg"));
    assert_eq!(first.expires_at.map(|t| t.timestamp()), Some(4_102_444_800));

    let second = resolver.resolve(&track, &cancel).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_resolver_falls_back_to_hls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tracks/8/streams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hls_opus_64_url": "https://cf-hls-opus-media.sndcdn.com/playlist/8.m3u8"
        })))
        .mount(&mock_server)
        .await;

    let resolver = SoundCloudResolver::new(client_for(&mock_server));
    let track = CanonicalTrack::new(ServiceType::SoundCloud, "8", "Opus only");
    let stream = resolver
        .resolve(&track, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stream.kind, StreamKind::AdaptiveManifest);
}

#[tokio::test]
async fn test_resolver_failures_are_typed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tracks/404/streams"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tracks/401/streams"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let resolver = SoundCloudResolver::new(client_for(&mock_server));
    let cancel = CancellationToken::new();

    let missing = CanonicalTrack::new(ServiceType::SoundCloud, "404", "gone");
    assert!(matches!(
        resolver.resolve(&missing, &cancel).await,
        Err(SourceError::NotFound(_))
    ));

    let forbidden = CanonicalTrack::new(ServiceType::SoundCloud, "401", "private");
    assert!(matches!(
        resolver.resolve(&forbidden, &cancel).await,
        Err(SourceError::Backend { status: 403, .. })
    ));

    let mut live = CanonicalTrack::new(ServiceType::SoundCloud, "1", "live");
    live.is_live = true;
    assert!(matches!(
        resolver.resolve(&live, &cancel).await,
        Err(SourceError::Unsupported(_))
    ));
}
