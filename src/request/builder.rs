//! Request construction from a captured template

use crate::capture::CapturedTemplate;
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, StringMap};
use reqwest::Method;
use url::Url;

/// Per-call overrides applied on top of the template variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOverrides {
    /// Sets `variables.userId`
    pub subject_id: Option<String>,
    /// Sets `variables.cursor`; `None` removes any cursor from the template
    pub cursor: Option<String>,
    /// Sets `variables.count`
    pub page_size: Option<u32>,
}

impl RequestOverrides {
    /// Create empty overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the subject id
    #[must_use]
    pub fn subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    /// Set the pagination cursor
    #[must_use]
    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Set the page size
    #[must_use]
    pub fn page_size(mut self, count: u32) -> Self {
        self.page_size = Some(count);
        self
    }
}

/// A fully formed request ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRequest {
    /// Always GET
    pub method: Method,
    /// Base URL with JSON-encoded GraphQL query parameters
    pub url: String,
    /// Headers copied verbatim from the template
    pub headers: StringMap,
}

/// Build a request from the template and overrides
///
/// The template's variables are copied before being modified. Fails with
/// `TemplateMissing` when no template is available.
pub fn build_request(
    template: Option<&CapturedTemplate>,
    overrides: &RequestOverrides,
) -> Result<BuiltRequest> {
    let template = template.ok_or(Error::TemplateMissing)?;

    let mut variables: JsonObject = match &template.variables {
        Some(JsonValue::Object(map)) => map.clone(),
        _ => JsonObject::new(),
    };

    if let Some(subject_id) = &overrides.subject_id {
        variables.insert("userId".to_string(), JsonValue::from(subject_id.clone()));
    }
    match &overrides.cursor {
        Some(cursor) => {
            variables.insert("cursor".to_string(), JsonValue::from(cursor.clone()));
        }
        None => {
            // First page must not carry a stale cursor
            variables.remove("cursor");
        }
    }
    if let Some(count) = overrides.page_size {
        variables.insert("count".to_string(), JsonValue::from(count));
    }

    let mut url = Url::parse(&template.base_url)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("variables", &JsonValue::Object(variables).to_string());
        if let Some(features) = &template.features {
            query.append_pair("features", &features.to_string());
        }
        if let Some(toggles) = &template.field_toggles {
            query.append_pair("fieldToggles", &toggles.to_string());
        }
    }

    Ok(BuiltRequest {
        method: Method::GET,
        url: url.into(),
        headers: template.headers.clone(),
    })
}
