//! Pagination engine module
//!
//! Drives request building, HTTP exchange and normalization page by page,
//! accumulating records across pages until a termination rule fires.
//!
//! # Overview
//!
//! The engine module provides:
//! - `PaginationEngine` - Runs one timeline harvest at a time
//! - `RunConfig` / `EngineOptions` - Per-run and fixed settings
//! - `RunState` - Records, seen ids and cursors of the current run
//! - `RunOutcome` / `StopReason` - How a run ended
//!
//! # Suspension points
//!
//! A run only yields at the HTTP call, the 429 backoff and the inter-page
//! delay. Both sleeps end early when the stop signal flips; the HTTP call is
//! always allowed to complete.

mod types;

pub use types::{
    EngineOptions, EnginePhase, Progress, RunConfig, RunOutcome, RunState, StopReason,
    DEFAULT_PAGE_SIZE, DEFAULT_PER_PAGE_DELAY_MS, DEFAULT_RATE_LIMIT_BACKOFF,
};

use crate::capture::CapturedTemplate;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::normalize::{extract_records_and_cursor, CanonicalRecord, ExtractOptions};
use crate::request::{build_request, RequestOverrides};
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

/// Run state shared between the engine and its controller
pub type SharedRunState = Arc<RwLock<RunState>>;

/// Pagination engine
///
/// Cloning is cheap; clones share the HTTP client and the run state.
#[derive(Debug, Clone)]
pub struct PaginationEngine {
    client: Arc<HttpClient>,
    options: EngineOptions,
    state: SharedRunState,
}

impl PaginationEngine {
    /// Create a new engine
    pub fn new(client: HttpClient) -> Self {
        Self {
            client: Arc::new(client),
            options: EngineOptions::default(),
            state: Arc::new(RwLock::new(RunState::default())),
        }
    }

    /// Set engine options
    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the engine options
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Get the shared run state
    pub fn state(&self) -> SharedRunState {
        Arc::clone(&self.state)
    }

    /// Copy of the records held so far
    pub async fn snapshot(&self) -> Vec<CanonicalRecord> {
        self.state.read().await.records.clone()
    }

    /// Current progress counters
    pub async fn progress(&self) -> Progress {
        self.state.read().await.progress(0, false)
    }

    /// Clear all run state
    pub async fn reset(&self) {
        *self.state.write().await = RunState::default();
    }

    /// Execute one run to completion
    ///
    /// Starts from an empty `RunState`. `on_progress` is called after every
    /// completed page and before every rate-limit backoff; it is never called
    /// after the run has returned.
    pub async fn run<F>(
        &self,
        template: CapturedTemplate,
        config: RunConfig,
        mut stop: watch::Receiver<bool>,
        mut on_progress: F,
    ) -> RunOutcome
    where
        F: FnMut(Progress) + Send,
    {
        {
            let mut state = self.state.write().await;
            *state = RunState::default();
            state.is_running = true;
        }
        info!(
            "Starting run for subject {} (max_records={:?}, min_views={})",
            config.subject_id, config.max_records, config.min_views_filter
        );

        let result = self
            .drive(&template, &config, &mut stop, &mut on_progress)
            .await;

        let mut state = self.state.write().await;
        state.is_running = false;
        let outcome = RunOutcome {
            count: state.records.len(),
            pages: state.page_count,
            result,
        };
        match &outcome.result {
            Ok(reason) => info!(
                "Run finished ({reason:?}): {} records in {} pages",
                outcome.count, outcome.pages
            ),
            Err(e) if e.is_upstream() => warn!(
                "Run failed after {} pages with {} records (status {:?}): {e}",
                outcome.pages,
                outcome.count,
                e.status()
            ),
            Err(e) => error!(
                "Run aborted after {} pages with {} records: {e}",
                outcome.pages, outcome.count
            ),
        }
        outcome
    }

    async fn drive<F>(
        &self,
        template: &CapturedTemplate,
        config: &RunConfig,
        stop: &mut watch::Receiver<bool>,
        on_progress: &mut F,
    ) -> Result<StopReason>
    where
        F: FnMut(Progress) + Send,
    {
        let max_records = config.record_limit();
        let extract_options = ExtractOptions::new().with_raw(self.options.include_raw);

        loop {
            if *stop.borrow() {
                return Ok(StopReason::Stopped);
            }

            let cursor = self.state.read().await.cursor.clone();
            let mut overrides = RequestOverrides::new()
                .subject(config.subject_id.clone())
                .page_size(self.options.page_size);
            if let Some(cursor) = cursor {
                overrides = overrides.cursor(cursor);
            }
            let request = build_request(Some(template), &overrides)?;
            let response = self.client.execute(&request).await?;

            match response.status {
                StatusCode::NOT_FOUND if *stop.borrow() => return Ok(StopReason::Stopped),
                StatusCode::NOT_FOUND => {
                    debug!("Upstream returned 404, treating as end of timeline");
                    return Ok(StopReason::EndOfTimeline);
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    warn!(
                        "Rate limited, retrying same cursor in {:?}",
                        self.options.rate_limit_backoff
                    );
                    let progress = self.state.read().await.progress(0, true);
                    on_progress(progress);
                    if !pause(self.options.rate_limit_backoff, stop).await {
                        return Ok(StopReason::Stopped);
                    }
                    continue;
                }
                status if !status.is_success() => {
                    return Err(Error::upstream_status(status.as_u16(), &response.body));
                }
                _ => {}
            }

            let raw: Value = serde_json::from_str(&response.body)
                .map_err(|e| Error::malformed(format!("Response body is not JSON: {e}")))?;
            if let Some(message) = graphql_errors(&raw) {
                return Err(Error::graphql(message));
            }

            let extraction = extract_records_and_cursor(&raw, extract_options);
            let found = extraction.records.len();

            let (progress, limit_reached) = {
                let mut state = self.state.write().await;
                let added =
                    state.merge_page(extraction.records, config.min_views_filter, max_records);
                state.page_count += 1;
                (state.progress(added, false), state.limit_reached(max_records))
            };
            debug!(
                "Page {}: {found} records found, {} new, {} total",
                progress.pages, progress.new_this_page, progress.count
            );
            on_progress(progress);

            // A stop that arrived during the request wins over the page's own ending
            if *stop.borrow() {
                return Ok(StopReason::Stopped);
            }
            if limit_reached {
                return Ok(StopReason::MaxRecords);
            }

            let Some(next) = extraction.next_cursor else {
                return Ok(StopReason::NoCursor);
            };
            {
                let mut state = self.state.write().await;
                if !state.seen_cursors.insert(next.clone()) {
                    debug!("Cursor repeated, stopping");
                    return Ok(StopReason::RepeatedCursor);
                }
                state.cursor = Some(next);
            }

            if !pause(config.per_page_delay(), stop).await {
                return Ok(StopReason::Stopped);
            }
        }
    }
}

/// Sleep for `duration` unless the stop signal flips first
///
/// Returns `false` when the run should stop.
async fn pause(duration: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    if *stop.borrow() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }

    let stopped = async {
        // A dropped sender can never signal a stop
        if stop.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        () = tokio::time::sleep(duration) => true,
        () = stopped => false,
    }
}

/// Concatenated messages of a non-empty top-level `errors` array
fn graphql_errors(raw: &Value) -> Option<String> {
    let errors = raw.get("errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }
    let messages: Vec<String> = errors
        .iter()
        .map(|error| match error.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => error.to_string(),
        })
        .collect();
    Some(messages.join("; "))
}
