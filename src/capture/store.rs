//! Template store and request matching
//!
//! Holds the last captured template (last-write-wins, no history) and
//! publishes a notice to every subscriber on each capture.

use super::types::{subject_from_variables, CaptureNotice, CapturedTemplate, ObservedRequest};
use crate::error::{Error, Result};
use crate::types::{now_epoch_ms, JsonValue, StringMap};
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use url::Url;

/// GraphQL operation whose requests are captured by default
pub const DEFAULT_OPERATION: &str = "UserTweets";

/// Capacity of the capture notice channel
const NOTICE_CAPACITY: usize = 64;

// ============================================================================
// Operation Matcher
// ============================================================================

/// Regex for GraphQL operation paths: /graphql/<queryId>/<OperationName>
static GRAPHQL_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/graphql/([^/]+)/([^/]+?)/?$").unwrap());

/// Matches `GET .../graphql/<queryId>/<OperationName>` requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMatcher {
    operation: String,
}

impl OperationMatcher {
    /// Create a matcher for the given operation name
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Operation name this matcher captures
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Check whether an observed request targets the operation
    pub fn matches(&self, request: &ObservedRequest) -> bool {
        if !request.method.eq_ignore_ascii_case("GET") {
            return false;
        }
        let Ok(url) = Url::parse(&request.url) else {
            return false;
        };
        GRAPHQL_PATH_REGEX
            .captures(url.path())
            .is_some_and(|caps| &caps[2] == self.operation)
    }

    /// Build a template from a matching request
    ///
    /// Returns `None` when the request does not target the operation. Header
    /// completeness is not validated.
    pub fn extract(&self, request: &ObservedRequest) -> Option<CapturedTemplate> {
        if !self.matches(request) {
            return None;
        }
        let url = Url::parse(&request.url).ok()?;

        let mut variables = None;
        let mut features = None;
        let mut field_toggles = None;
        for (key, value) in url.query_pairs() {
            let slot = match key.as_ref() {
                "variables" => &mut variables,
                "features" => &mut features,
                "fieldToggles" => &mut field_toggles,
                _ => continue,
            };
            *slot = decode_param(&key, &value);
        }

        // HTTP/2 pseudo-headers (`:authority`, `:path`, ...) are not replayable
        let headers: StringMap = request
            .headers
            .iter()
            .filter(|(name, _)| !name.starts_with(':'))
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();

        let subject_id = variables.as_ref().and_then(subject_from_variables);

        Some(CapturedTemplate {
            base_url: format!("{}{}", url.origin().ascii_serialization(), url.path()),
            method: request.method.to_ascii_uppercase(),
            headers,
            variables,
            features,
            field_toggles,
            captured_at_epoch_ms: now_epoch_ms(),
            subject_id,
        })
    }
}

impl Default for OperationMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_OPERATION)
    }
}

fn decode_param(key: &str, raw: &str) -> Option<JsonValue> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring undecodable '{key}' query parameter: {e}");
            None
        }
    }
}

// ============================================================================
// Template Store
// ============================================================================

/// Process-wide holder of the most recent capture
///
/// Cloning shares the same underlying slot and subscriber list.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    current: Arc<RwLock<Option<CapturedTemplate>>>,
    notices: broadcast::Sender<CaptureNotice>,
    matcher: OperationMatcher,
}

impl TemplateStore {
    /// Create an empty store capturing the default operation
    pub fn new() -> Self {
        Self::with_matcher(OperationMatcher::default())
    }

    /// Create an empty store with a custom matcher
    pub fn with_matcher(matcher: OperationMatcher) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            current: Arc::new(RwLock::new(None)),
            notices,
            matcher,
        }
    }

    /// Subscribe to capture notices
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureNotice> {
        self.notices.subscribe()
    }

    /// Get the matcher used by this store
    pub fn matcher(&self) -> &OperationMatcher {
        &self.matcher
    }

    /// Observe an outbound request, capturing it when it matches
    ///
    /// Returns the new template when the request was captured.
    pub async fn observe(&self, request: &ObservedRequest) -> Option<CapturedTemplate> {
        let Some(template) = self.matcher.extract(request) else {
            debug!("Ignoring non-matching request: {} {}", request.method, request.url);
            return None;
        };
        self.set(template.clone()).await;
        Some(template)
    }

    /// Replace the current template and notify subscribers
    pub async fn set(&self, template: CapturedTemplate) {
        let notice = template.notice();
        {
            let mut current = self.current.write().await;
            *current = Some(template);
        }
        info!(
            subject_id = notice.subject_id.as_deref().unwrap_or("-"),
            "Captured {} request template",
            self.matcher.operation()
        );
        // No subscribers is fine
        let _ = self.notices.send(notice);
    }

    /// Get a copy of the current template
    pub async fn get(&self) -> Option<CapturedTemplate> {
        self.current.read().await.clone()
    }

    /// Get the current template or fail with `TemplateMissing`
    pub async fn require(&self) -> Result<CapturedTemplate> {
        self.get().await.ok_or(Error::TemplateMissing)
    }

    /// Check whether a template has been captured
    pub async fn has_template(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Save the current template to a file
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let template = self.require().await?;
        let contents = serde_json::to_string_pretty(&template)?;

        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::capture(format!("Failed to write template file: {e}")))?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| Error::capture(format!("Failed to rename template file: {e}")))?;

        debug!("Saved template to {}", path.display());
        Ok(())
    }

    /// Load a template from a file, replacing the current one
    pub async fn load_from_file(&self, path: impl AsRef<Path>) -> Result<CapturedTemplate> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::capture(format!("Failed to read template file: {e}")))?;
        let template: CapturedTemplate = serde_json::from_str(&contents)
            .map_err(|e| Error::capture(format!("Failed to parse template file: {e}")))?;
        self.set(template.clone()).await;
        Ok(template)
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}
