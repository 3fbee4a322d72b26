//! Tests for capture module

use super::*;
use crate::error::Error;
use serde_json::json;

fn timeline_url(variables: &serde_json::Value) -> String {
    let mut url = url::Url::parse("https://x.com/i/api/graphql/abc123/UserTweets").unwrap();
    url.query_pairs_mut()
        .append_pair("variables", &variables.to_string())
        .append_pair("features", r#"{"view_counts_everywhere_api_enabled":true}"#)
        .append_pair("fieldToggles", r#"{"withArticlePlainText":false}"#);
    url.to_string()
}

fn timeline_request(user_id: &str) -> ObservedRequest {
    ObservedRequest::get(timeline_url(&json!({"userId": user_id, "count": 20})))
        .header("Authorization", "Bearer AAAA-token")
        .header("X-Csrf-Token", "csrf-value")
        .header("Cookie", "ct0=csrf-value; auth_token=secret")
}

#[test]
fn test_observed_headers_accept_pairs_har_entries_and_maps() {
    let url = timeline_url(&json!({"userId": "42"}));
    let shapes = [
        json!([["Authorization", "Bearer AAAA-token"], ["x-csrf-token", "csrf"]]),
        json!([
            {"name": "Authorization", "value": "Bearer AAAA-token"},
            {"name": "x-csrf-token", "value": "csrf"}
        ]),
        json!({"Authorization": "Bearer AAAA-token", "x-csrf-token": "csrf"}),
    ];

    for headers in shapes {
        let request: ObservedRequest =
            serde_json::from_value(json!({"method": "GET", "url": url, "headers": headers}))
                .unwrap();
        assert_eq!(request.headers.len(), 2);

        let template = OperationMatcher::default().extract(&request).unwrap();
        assert_eq!(template.headers["authorization"], "Bearer AAAA-token");
        assert_eq!(template.headers["x-csrf-token"], "csrf");
    }

    let bare: ObservedRequest =
        serde_json::from_value(json!({"method": "GET", "url": url})).unwrap();
    assert!(bare.headers.is_empty());
}

// ============================================================================
// OperationMatcher Tests
// ============================================================================

#[test]
fn test_matcher_accepts_operation_path() {
    let matcher = OperationMatcher::default();
    assert_eq!(matcher.operation(), "UserTweets");
    assert!(matcher.matches(&timeline_request("42")));
}

#[test]
fn test_matcher_rejects_other_operations_and_methods() {
    let matcher = OperationMatcher::default();

    let other = ObservedRequest::get("https://x.com/i/api/graphql/abc123/UserTweetsAndReplies");
    assert!(!matcher.matches(&other));

    let not_graphql = ObservedRequest::get("https://x.com/UserTweets");
    assert!(!matcher.matches(&not_graphql));

    let mut post = timeline_request("42");
    post.method = "POST".to_string();
    assert!(!matcher.matches(&post));

    let garbage = ObservedRequest::get("not a url");
    assert!(!matcher.matches(&garbage));
}

#[test]
fn test_matcher_custom_operation() {
    let matcher = OperationMatcher::new("UserTweetsAndReplies");
    let req = ObservedRequest::get("https://x.com/i/api/graphql/q1/UserTweetsAndReplies?x=1");
    assert!(matcher.matches(&req));
}

#[test]
fn test_extract_decodes_params_and_lowercases_headers() {
    let matcher = OperationMatcher::default();
    let template = matcher.extract(&timeline_request("42")).unwrap();

    assert_eq!(
        template.base_url,
        "https://x.com/i/api/graphql/abc123/UserTweets"
    );
    assert_eq!(template.method, "GET");
    assert_eq!(template.subject_id.as_deref(), Some("42"));
    assert_eq!(template.variables, Some(json!({"userId": "42", "count": 20})));
    assert_eq!(
        template.features,
        Some(json!({"view_counts_everywhere_api_enabled": true}))
    );
    assert_eq!(
        template.field_toggles,
        Some(json!({"withArticlePlainText": false}))
    );
    assert_eq!(
        template.headers.get("authorization").map(String::as_str),
        Some("Bearer AAAA-token")
    );
    assert!(template.headers.contains_key("x-csrf-token"));
    assert!(!template.headers.contains_key("Authorization"));
    assert!(template.captured_at_epoch_ms > 0);
}

#[test]
fn test_extract_tolerates_bad_params_and_missing_auth() {
    let matcher = OperationMatcher::default();
    let req =
        ObservedRequest::get("https://x.com/i/api/graphql/abc/UserTweets?variables=%7Bnot-json");
    let template = matcher.extract(&req).unwrap();
    assert!(template.variables.is_none());
    assert!(template.subject_id.is_none());
    assert!(template.headers.is_empty());
}

#[test]
fn test_extract_drops_http2_pseudo_headers() {
    let matcher = OperationMatcher::default();
    let req = timeline_request("42")
        .header(":authority", "x.com")
        .header(":method", "GET")
        .header(":path", "/i/api/graphql/abc123/UserTweets")
        .header(":scheme", "https");
    let template = matcher.extract(&req).unwrap();

    assert!(template.headers.keys().all(|name| !name.starts_with(':')));
    assert_eq!(template.headers.len(), 3);
    assert_eq!(template.headers["authorization"], "Bearer AAAA-token");
}

#[test]
fn test_numeric_user_id_becomes_subject() {
    let matcher = OperationMatcher::default();
    let req = ObservedRequest::get(timeline_url(&json!({"userId": 99})));
    let template = matcher.extract(&req).unwrap();
    assert_eq!(template.subject_id.as_deref(), Some("99"));
}

// ============================================================================
// CapturedTemplate Tests
// ============================================================================

#[test]
fn test_template_builder() {
    let template = CapturedTemplate::new("https://api.example/graphql/x/Op", Default::default())
        .with_variables(json!({"userId": "7"}))
        .with_features(json!({"a": true}));
    assert_eq!(template.subject_id.as_deref(), Some("7"));
    assert_eq!(template.method, "GET");
    assert!(template.field_toggles.is_none());
}

#[test]
fn test_redacted_masks_credentials_only() {
    let template = OperationMatcher::default()
        .extract(&timeline_request("42"))
        .unwrap()
        .redacted();
    assert_eq!(template.headers["authorization"], "Bear***");
    assert_eq!(template.headers["cookie"], "ct0=***");
    assert_eq!(template.headers["x-csrf-token"], "csrf***");
}

#[test]
fn test_template_serialization_uses_camel_case() {
    let template = CapturedTemplate::new("https://api.example/graphql/x/Op", Default::default())
        .with_variables(json!({"userId": "7"}));
    let value = serde_json::to_value(&template).unwrap();
    assert_eq!(value["baseUrl"], "https://api.example/graphql/x/Op");
    assert_eq!(value["subjectId"], "7");
    assert!(value.get("capturedAtEpochMs").is_some());
}

// ============================================================================
// TemplateStore Tests
// ============================================================================

#[tokio::test]
async fn test_store_starts_empty() {
    let store = TemplateStore::new();
    assert!(!store.has_template().await);
    assert!(matches!(store.require().await, Err(Error::TemplateMissing)));
}

#[tokio::test]
async fn test_store_last_write_wins() {
    let store = TemplateStore::new();
    store.observe(&timeline_request("1")).await.unwrap();
    store.observe(&timeline_request("2")).await.unwrap();

    let current = store.get().await.unwrap();
    assert_eq!(current.subject_id.as_deref(), Some("2"));
}

#[tokio::test]
async fn test_store_ignores_non_matching() {
    let store = TemplateStore::new();
    store.observe(&timeline_request("1")).await.unwrap();
    let ignored = store
        .observe(&ObservedRequest::get("https://x.com/i/api/graphql/q/Other"))
        .await;
    assert!(ignored.is_none());
    assert_eq!(
        store.get().await.unwrap().subject_id.as_deref(),
        Some("1")
    );
}

#[tokio::test]
async fn test_store_notifies_subscribers() {
    let store = TemplateStore::new();
    let mut rx = store.subscribe();
    let clone = store.clone();

    clone.observe(&timeline_request("77")).await.unwrap();

    let notice = rx.recv().await.unwrap();
    assert_eq!(notice.subject_id.as_deref(), Some("77"));
    assert!(notice.captured_at_epoch_ms > 0);
    // Clones share the same slot
    assert!(store.has_template().await);
}

#[tokio::test]
async fn test_store_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("template.json");

    let store = TemplateStore::new();
    let captured = store.observe(&timeline_request("5")).await.unwrap();
    store.save_to_file(&path).await.unwrap();
    assert!(path.exists());

    let fresh = TemplateStore::new();
    let loaded = fresh.load_from_file(&path).await.unwrap();
    assert_eq!(loaded, captured);
    assert_eq!(fresh.get().await, Some(captured));
}

#[tokio::test]
async fn test_store_save_without_template_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = TemplateStore::new();
    let result = store.save_to_file(dir.path().join("t.json")).await;
    assert!(matches!(result, Err(Error::TemplateMissing)));
}

#[tokio::test]
async fn test_store_load_missing_file() {
    let store = TemplateStore::new();
    let result = store.load_from_file("/nonexistent/template.json").await;
    assert!(matches!(result, Err(Error::FileNotFound { .. })));
}

// ============================================================================
// HAR Tests
// ============================================================================

#[tokio::test]
async fn test_har_last_matching_entry_wins() {
    let har = json!({
        "log": {
            "entries": [
                {"request": {"method": "GET", "url": timeline_url(&json!({"userId": "1"})),
                    "headers": [{"name": "Authorization", "value": "Bearer one"}]}},
                {"request": {"method": "GET", "url": "https://x.com/home", "headers": []}},
                {"request": {"method": "GET", "url": timeline_url(&json!({"userId": "2"})),
                    "headers": [{"name": "Authorization", "value": "Bearer two"}]}},
                {"request": {"method": "POST", "url": timeline_url(&json!({"userId": "3"}))}}
            ]
        }
    });

    let store = TemplateStore::new();
    let last = load_har_from_str(&store, &har.to_string())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(last.subject_id.as_deref(), Some("2"));
    assert_eq!(last.headers["authorization"], "Bearer two");
    assert_eq!(store.get().await, Some(last));
}

#[tokio::test]
async fn test_har_without_matches() {
    let har = json!({"log": {"entries": []}});
    let store = TemplateStore::new();
    let last = load_har_from_str(&store, &har.to_string()).await.unwrap();
    assert!(last.is_none());
    assert!(!store.has_template().await);
}

#[tokio::test]
async fn test_har_invalid_document() {
    let store = TemplateStore::new();
    let result = load_har_from_str(&store, "{\"entries\": []}").await;
    assert!(matches!(result, Err(Error::Capture { .. })));
}
