//! Tests for the HTTP transport

use super::*;
use crate::error::Error;
use crate::request::BuiltRequest;
use crate::types::StringMap;
use pretty_assertions::assert_eq;
use reqwest::{Method, StatusCode};
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn built(url: String, headers: &[(&str, &str)]) -> BuiltRequest {
    BuiltRequest {
        method: Method::GET,
        url,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<StringMap>(),
    }
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.rate_limit.is_none());
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .timeout(Duration::from_secs(5))
        .rate_limit(RateLimiterConfig::per_second(2))
        .build();

    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::new(2, 1)));

    let config = HttpClientConfig::builder()
        .rate_limit(RateLimiterConfig::default())
        .no_rate_limit()
        .build();
    assert!(config.rate_limit.is_none());
}

#[tokio::test]
async fn test_http_client_sends_template_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/i/api/graphql/abc/UserTweets"))
        .and(header("authorization", "Bearer AAAA"))
        .and(header("x-csrf-token", "csrf123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"data\":{}}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let request = built(
        format!("{}/i/api/graphql/abc/UserTweets", server.uri()),
        &[("authorization", "Bearer AAAA"), ("x-csrf-token", "csrf123")],
    );

    let response = client.execute(&request).await.unwrap();
    assert!(response.is_success());
    assert_eq!(response.body, "{\"data\":{}}");
}

#[tokio::test]
async fn test_http_client_preserves_query_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graphql/abc/UserTweets"))
        .and(query_param("variables", r#"{"userId":"42","count":20}"#))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let mut url = url::Url::parse(&format!("{}/graphql/abc/UserTweets", server.uri())).unwrap();
    url.query_pairs_mut()
        .append_pair("variables", r#"{"userId":"42","count":20}"#);

    let client = HttpClient::new().unwrap();
    let response = client.execute(&built(url.into(), &[])).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_http_client_adds_no_user_agent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(|req: &Request| {
            let has_agent = req.headers.get("user-agent").is_some();
            ResponseTemplate::new(200).set_body_string(has_agent.to_string())
        })
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let response = client
        .execute(&built(format!("{}/graphql", server.uri()), &[]))
        .await
        .unwrap();
    assert_eq!(response.body, "false");
}

#[tokio::test]
async fn test_http_client_passes_through_user_agent_from_template() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header_exists("user-agent"))
        .and(header("user-agent", "Mozilla/5.0 test"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    client
        .execute(&built(
            format!("{}/graphql", server.uri()),
            &[("user-agent", "Mozilla/5.0 test")],
        ))
        .await
        .unwrap();
}

#[test_case(404 ; "not found")]
#[test_case(429 ; "rate limited")]
#[test_case(500 ; "server error")]
#[tokio::test]
async fn test_http_client_returns_non_success_status(status: u16) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let response = client
        .execute(&built(format!("{}/graphql", server.uri()), &[]))
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), status);
    assert_eq!(response.body, "nope");
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_http_client_does_not_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let response = client
        .execute(&built(format!("{}/graphql", server.uri()), &[]))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_http_client_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .timeout(Duration::from_millis(50))
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let err = client
        .execute(&built(format!("{}/graphql", server.uri()), &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
}

#[tokio::test]
async fn test_http_client_invalid_header_value() {
    let client = HttpClient::new().unwrap();
    let request = built(
        "http://127.0.0.1:9/graphql".to_string(),
        &[("x-bad", "line\nbreak")],
    );

    let err = client.execute(&request).await.unwrap_err();
    assert!(matches!(err, Error::Capture { .. }));
}

#[tokio::test]
async fn test_http_client_with_rate_limiter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .rate_limit(RateLimiterConfig::new(100, 2))
        .build();
    let client = HttpClient::with_config(config).unwrap();
    assert!(client.has_rate_limiter());

    let request = built(format!("{}/graphql", server.uri()), &[]);
    client.execute(&request).await.unwrap();
    client.execute(&request).await.unwrap();
}

#[test]
fn test_http_client_debug() {
    let client = HttpClient::new().unwrap();
    let debug = format!("{client:?}");
    assert!(debug.contains("HttpClient"));
    assert!(debug.contains("has_rate_limiter"));
}

fn gzip(body: &[u8]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body).unwrap();
    encoder.finish().unwrap()
}

#[tokio::test]
async fn test_http_client_decodes_compressed_body() {
    let server = MockServer::start().await;
    let json = r#"{"data":{"user":{"result":{"rest_id":"42"}}}}"#;

    Mock::given(method("GET"))
        .and(path("/graphql/abc/UserTweets"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .insert_header("content-type", "application/json")
                .set_body_bytes(gzip(json.as_bytes())),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let request = built(
        format!("{}/graphql/abc/UserTweets", server.uri()),
        &[("accept-encoding", "gzip, deflate, br, zstd")],
    );

    let response = client.execute(&request).await.unwrap();
    assert!(response.is_success());
    assert_eq!(response.body, json);
}

#[tokio::test]
async fn test_http_client_skips_pseudo_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graphql/abc/UserTweets"))
        .and(header("authorization", "Bearer AAAA"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let request = built(
        format!("{}/graphql/abc/UserTweets", server.uri()),
        &[
            (":authority", "x.com"),
            (":path", "/i/api/graphql/abc/UserTweets"),
            ("authorization", "Bearer AAAA"),
        ],
    );

    let response = client.execute(&request).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
}
