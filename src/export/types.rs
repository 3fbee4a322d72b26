//! Export and import types

use serde::{Deserialize, Serialize};

/// Which slice of a timeline an export file holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    /// Replies dropped
    #[default]
    Tweets,
    /// Replies kept
    WithReplies,
}

impl ExportKind {
    /// Kind matching a run's `includeReplies` flag
    pub fn for_replies(include_replies: bool) -> Self {
        if include_replies {
            Self::WithReplies
        } else {
            Self::Tweets
        }
    }

    /// Name used in export filenames
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tweets => "tweets",
            Self::WithReplies => "with_replies",
        }
    }

    /// Whether replies belong in this export
    pub fn includes_replies(self) -> bool {
        self == Self::WithReplies
    }
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters returned by a batch upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    /// Newly stored records
    pub imported: usize,
    /// Rows lacking id, creation time or text
    pub skipped_invalid: usize,
    /// Rows whose id was already stored
    pub deduped: usize,
}

impl ImportStats {
    /// Total rows seen
    pub fn total(&self) -> usize {
        self.imported + self.skipped_invalid + self.deduped
    }
}

impl std::ops::AddAssign for ImportStats {
    fn add_assign(&mut self, other: Self) {
        self.imported += other.imported;
        self.skipped_invalid += other.skipped_invalid;
        self.deduped += other.deduped;
    }
}

/// Result of validating an export file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Rows carrying every required field
    pub valid: usize,
    /// Rows read
    pub total: usize,
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Valid: {}/{} tweets have required fields",
            self.valid, self.total
        )
    }
}
