//! Capture types
//!
//! The captured template is serialized to JSON when persisted between runs.

use crate::types::{JsonValue, StringMap};
use serde::{Deserialize, Serialize};

/// Header names whose values are credentials
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "x-csrf-token"];

/// An authenticated request description captured from live traffic
///
/// Immutable once captured; a newer observation replaces it entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedTemplate {
    /// Origin + path of the GraphQL operation
    pub base_url: String,
    /// HTTP method of the observed request
    pub method: String,
    /// Request headers, names lowercased
    #[serde(default)]
    pub headers: StringMap,
    /// Decoded `variables` query parameter
    #[serde(default)]
    pub variables: Option<JsonValue>,
    /// Decoded `features` query parameter
    #[serde(default)]
    pub features: Option<JsonValue>,
    /// Decoded `fieldToggles` query parameter
    #[serde(default)]
    pub field_toggles: Option<JsonValue>,
    /// When the request was observed
    pub captured_at_epoch_ms: i64,
    /// `variables.userId` of the observed request
    #[serde(default)]
    pub subject_id: Option<String>,
}

impl CapturedTemplate {
    /// Create a template with just a base URL and headers
    pub fn new(base_url: impl Into<String>, headers: StringMap) -> Self {
        Self {
            base_url: base_url.into(),
            method: "GET".to_string(),
            headers,
            variables: None,
            features: None,
            field_toggles: None,
            captured_at_epoch_ms: crate::types::now_epoch_ms(),
            subject_id: None,
        }
    }

    /// Set the variables object (also derives `subject_id` from `userId`)
    #[must_use]
    pub fn with_variables(mut self, variables: JsonValue) -> Self {
        self.subject_id = subject_from_variables(&variables);
        self.variables = Some(variables);
        self
    }

    /// Set the features object
    #[must_use]
    pub fn with_features(mut self, features: JsonValue) -> Self {
        self.features = Some(features);
        self
    }

    /// Set the field toggles object
    #[must_use]
    pub fn with_field_toggles(mut self, toggles: JsonValue) -> Self {
        self.field_toggles = Some(toggles);
        self
    }

    /// Copy of this template with credential header values masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for (name, value) in &mut copy.headers {
            if SENSITIVE_HEADERS.contains(&name.as_str()) {
                *value = mask(value);
            }
        }
        copy
    }

    /// Notice describing this capture for subscribers
    pub fn notice(&self) -> CaptureNotice {
        CaptureNotice {
            subject_id: self.subject_id.clone(),
            captured_at_epoch_ms: self.captured_at_epoch_ms,
        }
    }
}

/// Extract `userId` from a variables object, accepting strings or numbers
pub(crate) fn subject_from_variables(variables: &JsonValue) -> Option<String> {
    match variables.get("userId")? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    format!("{visible}***")
}

/// A single outbound HTTP request as seen by the observer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservedRequest {
    /// HTTP method
    pub method: String,
    /// Full request URL including query string
    pub url: String,
    /// Request headers as observed (any case)
    ///
    /// Accepts `[[name, value]]` pairs, HAR-style `[{"name", "value"}]`
    /// objects or a plain `{name: value}` map.
    #[serde(default, deserialize_with = "deserialize_headers")]
    pub headers: Vec<(String, String)>,
}

#[derive(Deserialize)]
struct NamedHeader {
    name: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderList {
    Pairs(Vec<(String, String)>),
    Named(Vec<NamedHeader>),
    Map(std::collections::BTreeMap<String, String>),
}

fn deserialize_headers<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match HeaderList::deserialize(deserializer)? {
        HeaderList::Pairs(pairs) => pairs,
        HeaderList::Named(named) => named.into_iter().map(|h| (h.name, h.value)).collect(),
        HeaderList::Map(map) => map.into_iter().collect(),
    })
}

impl ObservedRequest {
    /// Create a GET observation
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Notification sent to subscribers when a new template is captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureNotice {
    /// Subject id carried by the captured variables
    pub subject_id: Option<String>,
    /// Capture timestamp
    pub captured_at_epoch_ms: i64,
}
