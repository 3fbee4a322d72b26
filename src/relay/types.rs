//! Relay protocol messages
//!
//! Both directions serialize as JSON objects tagged by `type`, e.g.
//! `{"type":"start","subjectId":"7"}` or `{"type":"done","count":4,"pages":2}`.

use crate::capture::CaptureNotice;
use crate::engine::{Progress, RunConfig, StopReason};
use crate::normalize::CanonicalRecord;
use serde::{Deserialize, Serialize};

/// Controller to engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelayCommand {
    /// Begin a run
    Start(RunConfig),
    /// Ask the active run to halt after its in-flight request
    Stop,
    /// Request a `data` event with the current records
    GetData,
    /// Clear run state
    Reset,
}

impl RelayCommand {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Stop => "stop",
            Self::GetData => "getData",
            Self::Reset => "reset",
        }
    }
}

/// Engine to controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelayEvent {
    /// A page completed, or a 429 backoff began
    Progress(Progress),
    /// The run ended normally
    Done {
        count: usize,
        pages: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<StopReason>,
    },
    /// The run (or a start attempt) failed
    Error {
        message: String,
        pages: usize,
        count: usize,
    },
    /// Answer to `getData`
    Data { records: Vec<CanonicalRecord> },
    /// A new template was captured
    #[serde(rename_all = "camelCase")]
    TemplateCaptured {
        timestamp: i64,
        subject_id: Option<String>,
    },
    /// A command was refused in the current phase
    Rejected { command: String, reason: String },
}

impl RelayEvent {
    /// Whether this event ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Wire name of the event, matching its `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
            Self::Data { .. } => "data",
            Self::TemplateCaptured { .. } => "templateCaptured",
            Self::Rejected { .. } => "rejected",
        }
    }

    pub(crate) fn rejected(command: &RelayCommand, reason: impl Into<String>) -> Self {
        Self::Rejected {
            command: command.name().to_string(),
            reason: reason.into(),
        }
    }
}

impl From<CaptureNotice> for RelayEvent {
    fn from(notice: CaptureNotice) -> Self {
        Self::TemplateCaptured {
            timestamp: notice.captured_at_epoch_ms,
            subject_id: notice.subject_id,
        }
    }
}
