//! Normalizer types
//!
//! `CanonicalRecord` is the schema-stable shape written to JSONL exports. Its
//! serialized field names follow the importer's format (`tweet_id`, `url`,
//! `source`, `lang`); aliases accept the common variants on read.

use crate::types::JsonValue;
use serde::{Deserialize, Serialize};

/// Capture origin written into every record
pub const SOURCE_TAG: &str = "extension_network";

/// Engagement counters, each independently optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Like (favorite) count
    #[serde(default, alias = "like", alias = "like_count", alias = "favorite_count")]
    pub likes: Option<i64>,
    /// Retweet count
    #[serde(default, alias = "retweet", alias = "retweet_count")]
    pub retweets: Option<i64>,
    /// Reply count
    #[serde(default, alias = "reply", alias = "reply_count")]
    pub replies: Option<i64>,
    /// Quote count
    #[serde(default, alias = "quote", alias = "quote_count")]
    pub quotes: Option<i64>,
    /// View (impression) count
    #[serde(default, alias = "view", alias = "impression_count", alias = "impressions")]
    pub views: Option<i64>,
}

/// One normalized upstream item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Stable numeric-string id
    #[serde(rename = "tweet_id", alias = "id", alias = "id_str", alias = "tweetId")]
    pub id: String,
    /// Body text, never empty
    #[serde(alias = "full_text", alias = "content")]
    pub text: String,
    /// ISO-8601 creation time
    #[serde(default, alias = "createdAt", alias = "timestamp", alias = "date")]
    pub created_at: Option<String>,
    /// Link to the item
    #[serde(
        rename = "url",
        default,
        alias = "tweet_url",
        alias = "link",
        alias = "permalink"
    )]
    pub permalink: Option<String>,
    /// Capture origin
    #[serde(rename = "source", default = "default_source")]
    pub source_tag: String,
    /// Engagement counters
    #[serde(default, alias = "public_metrics")]
    pub metrics: Metrics,
    #[serde(default, alias = "isRetweet")]
    pub is_retweet: bool,
    #[serde(default, alias = "isReply")]
    pub is_reply: bool,
    #[serde(default, alias = "isQuote")]
    pub is_quote: bool,
    #[serde(default, alias = "isMention")]
    pub is_mention: bool,
    /// Screen name of the author
    #[serde(default, alias = "authorHandle")]
    pub author_handle: Option<String>,
    #[serde(default, alias = "conversationId")]
    pub conversation_id: Option<String>,
    /// Language code
    #[serde(rename = "lang", default, alias = "language")]
    pub language: Option<String>,
    /// Raw upstream object, only kept on request
    #[serde(rename = "raw", default, skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<JsonValue>,
}

fn default_source() -> String {
    SOURCE_TAG.to_string()
}

impl CanonicalRecord {
    /// Create a record with only id and text set
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at: None,
            permalink: None,
            source_tag: default_source(),
            metrics: Metrics::default(),
            is_retweet: false,
            is_reply: false,
            is_quote: false,
            is_mention: false,
            author_handle: None,
            conversation_id: None,
            language: None,
            raw_payload: None,
        }
    }

    /// Set the view count
    #[must_use]
    pub fn with_views(mut self, views: i64) -> Self {
        self.metrics.views = Some(views);
        self
    }
}

/// Which pagination marker to follow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorRole {
    /// Next (older) page
    #[default]
    Bottom,
    /// Previous (newer) page
    Top,
}

impl CursorRole {
    /// Value of the `cursorType` field for this role
    pub fn cursor_type(self) -> &'static str {
        match self {
            Self::Bottom => "Bottom",
            Self::Top => "Top",
        }
    }

    /// Prefix of timeline `entryId`s carrying this role
    pub fn entry_prefix(self) -> &'static str {
        match self {
            Self::Bottom => "cursor-bottom-",
            Self::Top => "cursor-top-",
        }
    }
}

/// Options controlling extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Keep the raw upstream object on each record
    pub include_raw: bool,
    /// Cursor role to look for
    pub cursor_role: CursorRole,
}

impl ExtractOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep raw payloads
    #[must_use]
    pub fn with_raw(mut self, include_raw: bool) -> Self {
        self.include_raw = include_raw;
        self
    }

    /// Look for a different cursor role
    #[must_use]
    pub fn with_cursor_role(mut self, role: CursorRole) -> Self {
        self.cursor_role = role;
        self
    }
}

/// Records and next cursor found in one response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Records in discovery order, unique by id
    pub records: Vec<CanonicalRecord>,
    /// Cursor for the next page
    pub next_cursor: Option<String>,
}
