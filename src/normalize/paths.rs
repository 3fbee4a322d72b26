//! Field path tables
//!
//! Each logical field lists the schema variants it may appear under. Paths are
//! tried in order and the first usable value wins, so the order of every table
//! is part of the behavior.

use crate::types::{lookup, lookup_str};
use serde_json::Value;

/// Ordered alternative locations of one logical field
#[derive(Debug, Clone, Copy)]
pub struct FieldPaths {
    /// Logical field name (for diagnostics)
    pub field: &'static str,
    /// Key paths, highest priority first
    pub paths: &'static [&'static [&'static str]],
}

impl FieldPaths {
    /// First non-empty string
    pub fn first_str<'a>(&self, value: &'a Value) -> Option<&'a str> {
        self.paths.iter().find_map(|path| lookup_str(value, path))
    }

    /// First value coercible to an integer
    pub fn first_int(&self, value: &Value) -> Option<i64> {
        self.paths
            .iter()
            .find_map(|path| lookup(value, path).and_then(coerce_int))
    }

    /// Whether any path holds a "present" value
    ///
    /// Present means: `true`, a non-empty string, an object or a non-empty
    /// array. `false`, `null` and empty strings are absent.
    pub fn any_present(&self, value: &Value) -> bool {
        self.paths
            .iter()
            .filter_map(|path| lookup(value, path))
            .any(is_present)
    }
}

/// Coerce a JSON number or numeric string to an integer
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Object(_) => true,
        Value::Array(items) => !items.is_empty(),
        Value::Number(_) => true,
        Value::Null => false,
    }
}

// ============================================================================
// Record Fields
// ============================================================================

/// Body text: long-form note, legacy full text, plain text
pub const TEXT: FieldPaths = FieldPaths {
    field: "text",
    paths: &[
        &["note_tweet", "note_tweet_results", "result", "text"],
        &["legacy", "full_text"],
        &["legacy", "text"],
        &["full_text"],
        &["text"],
    ],
};

pub const CREATED_AT: FieldPaths = FieldPaths {
    field: "created_at",
    paths: &[&["legacy", "created_at"], &["created_at"]],
};

pub const AUTHOR_HANDLE: FieldPaths = FieldPaths {
    field: "author_handle",
    paths: &[
        &["core", "user_results", "result", "legacy", "screen_name"],
        &["core", "user_results", "result", "core", "screen_name"],
        &["author", "screen_name"],
        &["user", "screen_name"],
    ],
};

pub const CONVERSATION_ID: FieldPaths = FieldPaths {
    field: "conversation_id",
    paths: &[&["legacy", "conversation_id_str"], &["conversation_id_str"]],
};

pub const LANGUAGE: FieldPaths = FieldPaths {
    field: "lang",
    paths: &[&["legacy", "lang"], &["lang"]],
};

// ============================================================================
// Metrics
// ============================================================================

pub const LIKES: FieldPaths = FieldPaths {
    field: "likes",
    paths: &[
        &["legacy", "favorite_count"],
        &["favorite_count"],
        &["like_count"],
    ],
};

pub const RETWEETS: FieldPaths = FieldPaths {
    field: "retweets",
    paths: &[&["legacy", "retweet_count"], &["retweet_count"]],
};

pub const REPLIES: FieldPaths = FieldPaths {
    field: "replies",
    paths: &[&["legacy", "reply_count"], &["reply_count"]],
};

pub const QUOTES: FieldPaths = FieldPaths {
    field: "quotes",
    paths: &[&["legacy", "quote_count"], &["quote_count"]],
};

pub const VIEWS: FieldPaths = FieldPaths {
    field: "views",
    paths: &[
        &["views", "count"],
        &["ext_views", "count"],
        &["view_count"],
    ],
};

// ============================================================================
// Classification Flags
// ============================================================================

pub const REPLY_TARGET: FieldPaths = FieldPaths {
    field: "is_reply",
    paths: &[
        &["legacy", "in_reply_to_status_id_str"],
        &["in_reply_to_status_id_str"],
    ],
};

pub const QUOTE_STATUS: FieldPaths = FieldPaths {
    field: "is_quote",
    paths: &[
        &["legacy", "is_quote_status"],
        &["quoted_status_result"],
        &["is_quote_status"],
    ],
};

pub const RETWEET_STATUS: FieldPaths = FieldPaths {
    field: "is_retweet",
    paths: &[
        &["legacy", "retweeted_status_result"],
        &["retweeted_status_result"],
    ],
};

/// Text prefix of retweet boilerplate
pub const RETWEET_PREFIX: &str = "RT @";

// ============================================================================
// Traversal
// ============================================================================

/// Fields whose subtrees only carry media / card payloads
///
/// None of them can contain a timeline item, so skipping them never loses a
/// record.
pub const SKIP_FIELDS: &[&str] = &[
    "entities",
    "extended_entities",
    "media",
    "binding_values",
    "ext_media_availability",
    "original_info",
    "sizes",
];

/// `__typename` values of deleted / withheld placeholders
pub const PLACEHOLDER_TYPES: &[&str] = &["TweetTombstone", "TweetUnavailable"];

/// `__typename` of a regular record
pub const RECORD_TYPE: &str = "Tweet";

/// `__typename` of a wrapper that nests the record under `tweet`
pub const VISIBILITY_WRAPPER_TYPE: &str = "TweetWithVisibilityResults";

/// Locations, relative to any object, of a `{cursorType, value}` marker
pub const CURSOR_LOCATIONS: &[&[&str]] = &[
    &[],
    &["content"],
    &["itemContent"],
    &["content", "itemContent"],
];

/// Value locations inside a `cursor-<role>-*` timeline entry
pub const ENTRY_CURSOR_PATHS: &[&[&str]] =
    &[&["content", "value"], &["content", "itemContent", "value"]];
