//! Engine types
//!
//! Run configuration, run state and the values reported back while a run
//! progresses.

use crate::capture::CapturedTemplate;
use crate::error::Error;
use crate::normalize::CanonicalRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Default delay between two page requests
pub const DEFAULT_PER_PAGE_DELAY_MS: u64 = 1500;

/// Default page size requested from the upstream
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default wait after an HTTP 429
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

fn default_per_page_delay_ms() -> u64 {
    DEFAULT_PER_PAGE_DELAY_MS
}

/// Parameters of a single run, supplied with `start`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Whose timeline to page through
    pub subject_id: String,
    /// Stop once this many records are held (`None` or 0 = unlimited)
    #[serde(default)]
    pub max_records: Option<usize>,
    /// Pause between pages
    #[serde(default = "default_per_page_delay_ms")]
    pub per_page_delay_ms: u64,
    /// Discard records whose declared views are below this (0 = off)
    #[serde(default)]
    pub min_views_filter: i64,
    /// Advisory only; reply filtering is applied at export time
    #[serde(default)]
    pub include_replies: bool,
    /// Explicit template; the last captured one is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<CapturedTemplate>,
}

impl RunConfig {
    /// Create a config for a subject with default settings
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            max_records: None,
            per_page_delay_ms: DEFAULT_PER_PAGE_DELAY_MS,
            min_views_filter: 0,
            include_replies: false,
            template: None,
        }
    }

    /// Set the record limit
    #[must_use]
    pub fn max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Set the inter-page delay
    #[must_use]
    pub fn per_page_delay_ms(mut self, delay_ms: u64) -> Self {
        self.per_page_delay_ms = delay_ms;
        self
    }

    /// Set the minimum views filter
    #[must_use]
    pub fn min_views(mut self, views: i64) -> Self {
        self.min_views_filter = views;
        self
    }

    /// Mark replies as wanted in the export
    #[must_use]
    pub fn include_replies(mut self, include: bool) -> Self {
        self.include_replies = include;
        self
    }

    /// Use an explicit template instead of the last captured one
    #[must_use]
    pub fn template(mut self, template: CapturedTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Effective record limit
    pub fn record_limit(&self) -> Option<usize> {
        self.max_records.filter(|max| *max > 0)
    }

    /// Inter-page delay as a duration
    pub fn per_page_delay(&self) -> Duration {
        Duration::from_millis(self.per_page_delay_ms)
    }
}

/// Engine settings that stay fixed across runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// `variables.count` sent with every page request
    pub page_size: u32,
    /// Wait before retrying a rate-limited page
    pub rate_limit_backoff: Duration,
    /// Keep the raw upstream object on each record
    pub include_raw: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
            include_raw: false,
        }
    }
}

impl EngineOptions {
    /// Set the page size
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the rate-limit backoff
    #[must_use]
    pub fn rate_limit_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }

    /// Keep raw payloads on records
    #[must_use]
    pub fn include_raw(mut self, include: bool) -> Self {
        self.include_raw = include;
        self
    }
}

/// Lifecycle state of the engine as seen by the controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnginePhase {
    #[default]
    Idle,
    Running,
    Stopping,
    Done,
    Failed,
}

impl std::fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Upstream answered 404
    EndOfTimeline,
    /// Page carried no next cursor
    NoCursor,
    /// Next cursor was already requested
    RepeatedCursor,
    /// Record limit reached
    MaxRecords,
    /// Stopped by the controller
    Stopped,
}

/// Per-page (or per rate-limit) progress report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Records held so far
    pub count: usize,
    /// Pages completed so far
    pub pages: usize,
    /// Records added by the latest page
    pub new_this_page: usize,
    /// Set when the report announces a 429 backoff
    pub rate_limited: bool,
}

/// Mutable state of one run
///
/// `seen_ids` holds exactly the ids in `records`. Ids dropped by the views
/// filter go to `discarded_ids` so they are never admitted later either.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub is_running: bool,
    pub records: Vec<CanonicalRecord>,
    pub seen_ids: HashSet<String>,
    pub discarded_ids: HashSet<String>,
    pub seen_cursors: HashSet<String>,
    pub page_count: usize,
    pub cursor: Option<String>,
}

impl RunState {
    /// Whether an id was admitted or discarded before
    pub fn is_seen(&self, id: &str) -> bool {
        self.seen_ids.contains(id) || self.discarded_ids.contains(id)
    }

    /// Whether the record limit is reached
    pub fn limit_reached(&self, max_records: Option<usize>) -> bool {
        max_records.is_some_and(|max| self.records.len() >= max)
    }

    /// Merge one page of records, returning how many were appended
    ///
    /// Records already seen are ignored, even if their metrics changed.
    pub fn merge_page(
        &mut self,
        page: Vec<CanonicalRecord>,
        min_views: i64,
        max_records: Option<usize>,
    ) -> usize {
        let mut added = 0;
        for record in page {
            if self.limit_reached(max_records) {
                break;
            }
            if self.is_seen(&record.id) {
                continue;
            }
            let below_filter =
                min_views > 0 && record.metrics.views.is_some_and(|views| views < min_views);
            if below_filter {
                self.discarded_ids.insert(record.id);
                continue;
            }
            self.seen_ids.insert(record.id.clone());
            self.records.push(record);
            added += 1;
        }
        added
    }

    /// Progress report for the current state
    pub fn progress(&self, new_this_page: usize, rate_limited: bool) -> Progress {
        Progress {
            count: self.records.len(),
            pages: self.page_count,
            new_this_page,
            rate_limited,
        }
    }
}

/// Final result of a run
#[derive(Debug)]
pub struct RunOutcome {
    /// Records held at the end
    pub count: usize,
    /// Pages completed
    pub pages: usize,
    /// Normal stop reason, or the fatal error
    pub result: Result<StopReason, Error>,
}

impl RunOutcome {
    /// Phase the engine lands in after this outcome
    pub fn phase(&self) -> EnginePhase {
        match &self.result {
            Ok(StopReason::Stopped) => EnginePhase::Idle,
            Ok(_) => EnginePhase::Done,
            Err(_) => EnginePhase::Failed,
        }
    }

    /// Stop reason, if the run ended normally
    pub fn reason(&self) -> Option<StopReason> {
        self.result.as_ref().ok().copied()
    }
}
