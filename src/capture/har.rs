//! HAR (HTTP Archive) ingestion
//!
//! Browser devtools can export recorded traffic as a HAR file. Feeding every
//! entry to the store reproduces passive observation: the last matching
//! request in file order becomes the current template.

use super::store::TemplateStore;
use super::types::{CapturedTemplate, ObservedRequest};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct Har {
    log: HarLog,
}

#[derive(Debug, Deserialize)]
struct HarLog {
    #[serde(default)]
    entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
struct HarEntry {
    request: HarRequest,
}

#[derive(Debug, Deserialize)]
struct HarRequest {
    method: String,
    url: String,
    #[serde(default)]
    headers: Vec<HarHeader>,
}

#[derive(Debug, Deserialize)]
struct HarHeader {
    name: String,
    value: String,
}

impl From<HarRequest> for ObservedRequest {
    fn from(req: HarRequest) -> Self {
        Self {
            method: req.method,
            url: req.url,
            headers: req.headers.into_iter().map(|h| (h.name, h.value)).collect(),
        }
    }
}

/// Observe every request of a HAR document
///
/// Returns the last captured template, if any entry matched.
pub async fn load_har_from_str(
    store: &TemplateStore,
    contents: &str,
) -> Result<Option<CapturedTemplate>> {
    let har: Har = serde_json::from_str(contents)
        .map_err(|e| Error::capture(format!("Invalid HAR document: {e}")))?;

    let total = har.log.entries.len();
    let mut last = None;
    let mut matched = 0usize;
    for entry in har.log.entries {
        let request = ObservedRequest::from(entry.request);
        if let Some(template) = store.observe(&request).await {
            matched += 1;
            last = Some(template);
        }
    }

    info!("Scanned {total} HAR entries, {matched} matched");
    Ok(last)
}

/// Observe every request of a HAR file
pub async fn load_har(
    store: &TemplateStore,
    path: impl AsRef<Path>,
) -> Result<Option<CapturedTemplate>> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::capture(format!("Failed to read {}: {e}", path.display())))?;
    load_har_from_str(store, &contents).await
}
