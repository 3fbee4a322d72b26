//! Record and cursor discovery
//!
//! Both walks are read-only over the same payload and share no state.

use super::paths::{
    self, FieldPaths, CURSOR_LOCATIONS, ENTRY_CURSOR_PATHS, PLACEHOLDER_TYPES, RECORD_TYPE,
    RETWEET_PREFIX, SKIP_FIELDS, VISIBILITY_WRAPPER_TYPE,
};
use super::types::{CanonicalRecord, CursorRole, ExtractOptions, Extraction, Metrics};
use crate::types::{lookup, lookup_str};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashSet;

/// Id locations of a record candidate
const ID: FieldPaths = FieldPaths {
    field: "id",
    paths: &[&["rest_id"], &["id_str"]],
};

/// Timestamp layout used by the legacy payload: `Wed Oct 10 20:19:24 +0000 2018`
const LEGACY_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Extract every record and the next-page cursor from a raw response
pub fn extract_records_and_cursor(raw: &Value, options: ExtractOptions) -> Extraction {
    Extraction {
        records: extract_records(raw, options.include_raw),
        next_cursor: find_cursor(raw, options.cursor_role),
    }
}

// ============================================================================
// Record Discovery
// ============================================================================

/// Extract records in discovery order, unique by id within this response
pub fn extract_records(raw: &Value, include_raw: bool) -> Vec<CanonicalRecord> {
    let mut collector = Collector {
        seen: HashSet::new(),
        records: Vec::new(),
        include_raw,
    };
    collector.walk(raw);
    collector.records
}

struct Collector {
    seen: HashSet<String>,
    records: Vec<CanonicalRecord>,
    include_raw: bool,
}

impl Collector {
    fn walk(&mut self, value: &Value) {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.walk(item);
                }
            }
            Value::Object(map) => {
                if let Some(candidate) = resolve_candidate(value) {
                    self.accept(candidate);
                }
                for (key, child) in map {
                    if SKIP_FIELDS.contains(&key.as_str()) {
                        continue;
                    }
                    self.walk(child);
                }
            }
            _ => {}
        }
    }

    fn accept(&mut self, candidate: &Value) {
        let Some(id) = candidate_id(candidate) else {
            return;
        };
        if self.seen.contains(id) {
            return;
        }
        if let Some(record) = build_record(id, candidate, self.include_raw) {
            self.seen.insert(record.id.clone());
            self.records.push(record);
        }
    }
}

fn typename(value: &Value) -> Option<&str> {
    value.get("__typename").and_then(Value::as_str)
}

fn candidate_id(value: &Value) -> Option<&str> {
    ID.first_str(value)
        .filter(|id| id.bytes().all(|b| b.is_ascii_digit()))
}

/// An object is record-like when it has a numeric id plus a record type
/// marker or a nested `legacy` object
fn is_record_like(value: &Value) -> bool {
    if typename(value).is_some_and(|t| PLACEHOLDER_TYPES.contains(&t)) {
        return false;
    }
    let has_legacy = value.get("legacy").is_some_and(Value::is_object);
    candidate_id(value).is_some() && (typename(value) == Some(RECORD_TYPE) || has_legacy)
}

/// Unwrap a visibility wrapper (`{__typename, tweet: {...}}`)
fn unwrap_visibility(value: &Value) -> &Value {
    if typename(value) == Some(VISIBILITY_WRAPPER_TYPE) {
        if let Some(inner) = value.get("tweet") {
            return inner;
        }
    }
    value
}

/// Find the record carried by this object, directly or one level down under
/// a `*_results.result` wrapper
fn resolve_candidate(value: &Value) -> Option<&Value> {
    let direct = unwrap_visibility(value);
    if is_record_like(direct) {
        return Some(direct);
    }

    let map = value.as_object()?;
    map.iter()
        .filter(|(key, _)| key.ends_with("_results"))
        .filter_map(|(_, wrapper)| wrapper.get("result"))
        .map(unwrap_visibility)
        .find(|inner| is_record_like(inner))
}

fn build_record(id: &str, candidate: &Value, include_raw: bool) -> Option<CanonicalRecord> {
    let text = paths::TEXT
        .first_str(candidate)
        .filter(|t| !t.trim().is_empty())?
        .to_string();

    let author_handle = paths::AUTHOR_HANDLE.first_str(candidate).map(str::to_string);
    let is_retweet =
        paths::RETWEET_STATUS.any_present(candidate) || text.starts_with(RETWEET_PREFIX);
    let is_mention = text.starts_with('@') && !is_retweet;

    Some(CanonicalRecord {
        id: id.to_string(),
        created_at: paths::CREATED_AT
            .first_str(candidate)
            .and_then(normalize_timestamp),
        permalink: Some(permalink(author_handle.as_deref(), id)),
        source_tag: super::SOURCE_TAG.to_string(),
        metrics: Metrics {
            likes: paths::LIKES.first_int(candidate),
            retweets: paths::RETWEETS.first_int(candidate),
            replies: paths::REPLIES.first_int(candidate),
            quotes: paths::QUOTES.first_int(candidate),
            views: paths::VIEWS.first_int(candidate),
        },
        is_retweet,
        is_reply: paths::REPLY_TARGET.any_present(candidate),
        is_quote: paths::QUOTE_STATUS.any_present(candidate),
        is_mention,
        author_handle,
        conversation_id: paths::CONVERSATION_ID
            .first_str(candidate)
            .map(str::to_string),
        language: paths::LANGUAGE.first_str(candidate).map(str::to_string),
        raw_payload: include_raw.then(|| candidate.clone()),
        text,
    })
}

/// Convert legacy or RFC 3339 timestamps to `YYYY-MM-DDTHH:MM:SSZ`
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    DateTime::parse_from_str(raw, LEGACY_TIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
}

fn permalink(handle: Option<&str>, id: &str) -> String {
    match handle {
        Some(handle) => format!("https://x.com/{handle}/status/{id}"),
        None => format!("https://x.com/i/web/status/{id}"),
    }
}

// ============================================================================
// Cursor Discovery
// ============================================================================

/// Find the first non-empty cursor of the given role, depth-first
pub fn find_cursor(raw: &Value, role: CursorRole) -> Option<String> {
    match raw {
        Value::Array(items) => items.iter().find_map(|item| find_cursor(item, role)),
        Value::Object(map) => {
            if let Some(cursor) = cursor_at(raw, role) {
                return Some(cursor);
            }
            map.iter()
                .filter(|(key, _)| !SKIP_FIELDS.contains(&key.as_str()))
                .find_map(|(_, child)| find_cursor(child, role))
        }
        _ => None,
    }
}

fn cursor_at(value: &Value, role: CursorRole) -> Option<String> {
    for location in CURSOR_LOCATIONS {
        let Some(marker) = lookup(value, location) else {
            continue;
        };
        let role_type = marker.get("cursorType").and_then(Value::as_str);
        if role_type == Some(role.cursor_type()) {
            if let Some(cursor) = lookup_str(marker, &["value"]) {
                return Some(cursor.to_string());
            }
        }
    }

    // Timeline entries also encode the role in their id
    let entry_id = value.get("entryId").and_then(Value::as_str)?;
    if !entry_id.starts_with(role.entry_prefix()) {
        return None;
    }
    ENTRY_CURSOR_PATHS
        .iter()
        .find_map(|path| lookup_str(value, path))
        .map(str::to_string)
}
