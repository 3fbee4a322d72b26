//! Tests for request builder module

use super::*;
use crate::capture::CapturedTemplate;
use crate::error::Error;
use crate::types::StringMap;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;

fn template() -> CapturedTemplate {
    let mut headers = StringMap::new();
    headers.insert("authorization".to_string(), "Bearer t".to_string());
    headers.insert("x-csrf-token".to_string(), "csrf".to_string());
    CapturedTemplate::new("https://api.example/graphql/x/Op", headers)
        .with_variables(json!({"userId": "7", "count": 20, "cursor": "stale", "withVoice": true}))
        .with_features(json!({"f1": true}))
}

fn query_of(request: &BuiltRequest) -> HashMap<String, Value> {
    url::Url::parse(&request.url)
        .unwrap()
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), serde_json::from_str(&v).unwrap()))
        .collect()
}

#[test]
fn test_build_without_template_fails() {
    let result = build_request(None, &RequestOverrides::new());
    assert!(matches!(result, Err(Error::TemplateMissing)));
}

#[test]
fn test_first_page_removes_stale_cursor() {
    let template = template();
    let request = build_request(Some(&template), &RequestOverrides::new()).unwrap();

    let query = query_of(&request);
    assert_eq!(
        query["variables"],
        json!({"userId": "7", "count": 20, "withVoice": true})
    );
    assert_eq!(query["features"], json!({"f1": true}));
    assert!(!query.contains_key("fieldToggles"));
}

#[test]
fn test_overrides_applied() {
    let template = template();
    let overrides = RequestOverrides::new()
        .subject("99")
        .cursor("DAABCgAB")
        .page_size(40);
    let request = build_request(Some(&template), &overrides).unwrap();

    let variables = &query_of(&request)["variables"];
    assert_eq!(variables["userId"], "99");
    assert_eq!(variables["cursor"], "DAABCgAB");
    assert_eq!(variables["count"], 40);
    assert_eq!(variables["withVoice"], true);
}

#[test]
fn test_template_not_mutated() {
    let template = template();
    let before = template.clone();
    let overrides = RequestOverrides::new().subject("1").cursor("c").page_size(5);

    build_request(Some(&template), &overrides).unwrap();
    build_request(Some(&template), &RequestOverrides::new()).unwrap();

    assert_eq!(template, before);
}

#[test]
fn test_method_and_headers_verbatim() {
    let template = template();
    let request = build_request(Some(&template), &RequestOverrides::new()).unwrap();

    assert_eq!(request.method, reqwest::Method::GET);
    assert_eq!(request.headers, template.headers);
    assert!(request
        .url
        .starts_with("https://api.example/graphql/x/Op?variables="));
}

#[test]
fn test_missing_variables_start_empty() {
    let template = CapturedTemplate::new("https://api.example/graphql/x/Op", StringMap::new())
        .with_field_toggles(json!({"t": false}));
    let request =
        build_request(Some(&template), &RequestOverrides::new().subject("3")).unwrap();

    let query = query_of(&request);
    assert_eq!(query["variables"], json!({"userId": "3"}));
    assert_eq!(query["fieldToggles"], json!({"t": false}));
    assert!(!query.contains_key("features"));
}

#[test]
fn test_invalid_base_url() {
    let template = CapturedTemplate::new("not a url", StringMap::new());
    let result = build_request(Some(&template), &RequestOverrides::new());
    assert!(matches!(result, Err(Error::InvalidUrl(_))));
}
