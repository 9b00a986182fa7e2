//! Integration tests for the shared HTTP transport

use sbsource::{ErrorKind, HttpTransport, SourceError};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct Echo {
    value: u32,
}

fn transport() -> HttpTransport {
    HttpTransport::new(Duration::from_secs(5), "sbsource-tests").unwrap()
}

#[tokio::test]
async fn test_get_json_sends_query_and_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("limit", "10"))
        .and(header("authorization", "Bearer secret"))
        .and(header("user-agent", "sbsource-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": 7 })))
        .mount(&mock_server)
        .await;

    let echo: Echo = transport()
        .get_json(
            &format!("{}/items", mock_server.uri()),
            &[("limit", "10".to_string())],
            Some("secret"),
        )
        .await
        .unwrap();

    assert_eq!(echo.value, 7);
}

#[tokio::test]
async fn test_post_json_sends_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/player"))
        .and(body_json(json!({ "videoId": "abc" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": 1 })))
        .mount(&mock_server)
        .await;

    let echo: Echo = transport()
        .post_json(
            &format!("{}/player", mock_server.uri()),
            &[],
            &json!({ "videoId": "abc" }),
            None,
        )
        .await
        .unwrap();

    assert_eq!(echo.value, 1);
}

#[tokio::test]
async fn test_status_codes_become_typed_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such track"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let transport = transport();

    let missing = transport
        .get_json::<Echo>(&format!("{}/missing", mock_server.uri()), &[], None)
        .await
        .unwrap_err();
    assert_eq!(missing, SourceError::NotFound("no such track".into()));

    let broken = transport
        .get_json::<Echo>(&format!("{}/broken", mock_server.uri()), &[], None)
        .await
        .unwrap_err();
    assert_eq!(broken.kind(), ErrorKind::Backend { status: 503 });
    assert!(broken.is_transient());
}

#[tokio::test]
async fn test_unreadable_body_is_a_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&mock_server)
        .await;

    let err = transport()
        .get_json::<Echo>(&format!("{}/garbage", mock_server.uri()), &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_host_is_a_network_error() {
    let err = transport()
        .get_json::<Echo>("http://127.0.0.1:9/nothing", &[], None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}
