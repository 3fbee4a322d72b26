//! Export file reader
//!
//! Accepts JSONL (one object per line) and JSON (array, single object, or
//! `{"tweets": [...]}`) files written by this crate or by older exporters,
//! resolving the common field-name variants.

use super::types::ValidationReport;
use crate::error::{Error, Result};
use crate::normalize::paths::FieldPaths;
use crate::normalize::{CanonicalRecord, Metrics, SOURCE_TAG};
use crate::types::JsonValue;
use std::path::Path;
use tracing::debug;

const ID: FieldPaths = FieldPaths {
    field: "tweet_id",
    paths: &[&["tweet_id"], &["id"], &["id_str"], &["tweetId"]],
};
const CREATED_AT: FieldPaths = FieldPaths {
    field: "created_at",
    paths: &[&["created_at"], &["createdAt"], &["timestamp"], &["date"]],
};
const TEXT: FieldPaths = FieldPaths {
    field: "text",
    paths: &[&["text"], &["full_text"], &["content"]],
};
const URL: FieldPaths = FieldPaths {
    field: "url",
    paths: &[&["url"], &["tweet_url"], &["link"], &["permalink"]],
};
const SOURCE: FieldPaths = FieldPaths {
    field: "source",
    paths: &[&["source"]],
};
const LANG: FieldPaths = FieldPaths {
    field: "lang",
    paths: &[&["lang"], &["language"]],
};
const AUTHOR: FieldPaths = FieldPaths {
    field: "author_handle",
    paths: &[&["author_handle"], &["authorHandle"]],
};
const CONVERSATION: FieldPaths = FieldPaths {
    field: "conversation_id",
    paths: &[&["conversation_id"], &["conversationId"]],
};
const IS_RETWEET: FieldPaths = FieldPaths {
    field: "is_retweet",
    paths: &[&["is_retweet"], &["isRetweet"]],
};
const IS_REPLY: FieldPaths = FieldPaths {
    field: "is_reply",
    paths: &[&["is_reply"], &["isReply"]],
};
const IS_QUOTE: FieldPaths = FieldPaths {
    field: "is_quote",
    paths: &[&["is_quote"], &["isQuote"]],
};
const IS_MENTION: FieldPaths = FieldPaths {
    field: "is_mention",
    paths: &[&["is_mention"], &["isMention"]],
};

// Metric keys, looked up inside `metrics`, `public_metrics`, or the row itself
const LIKES: FieldPaths = FieldPaths {
    field: "likes",
    paths: &[&["likes"], &["like"], &["like_count"], &["favorite_count"]],
};
const RETWEETS: FieldPaths = FieldPaths {
    field: "retweets",
    paths: &[&["retweets"], &["retweet"], &["retweet_count"]],
};
const REPLIES: FieldPaths = FieldPaths {
    field: "replies",
    paths: &[&["replies"], &["reply"], &["reply_count"]],
};
const QUOTES: FieldPaths = FieldPaths {
    field: "quotes",
    paths: &[&["quotes"], &["quote"], &["quote_count"]],
};
const VIEWS: FieldPaths = FieldPaths {
    field: "views",
    paths: &[&["views"], &["view"], &["impression_count"], &["impressions"]],
};

/// Rows read from an export file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportContents {
    /// Rows carrying at least an id and text
    pub records: Vec<CanonicalRecord>,
    /// Rows missing an id or text
    pub invalid: usize,
}

impl ExportContents {
    /// Rows read, valid or not
    pub fn total(&self) -> usize {
        self.records.len() + self.invalid
    }
}

/// Read an export file
///
/// `.jsonl` is read line by line, `.json` as one document; any other
/// extension tries JSONL first, then JSON.
pub fn read_export(path: impl AsRef<Path>) -> Result<ExportContents> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let contents = std::fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let rows = match extension.as_deref() {
        Some("jsonl") => parse_jsonl(&contents)?,
        Some("json") => parse_json(&contents)?,
        _ => parse_jsonl(&contents).or_else(|_| parse_json(&contents))?,
    };

    let mut result = ExportContents::default();
    for row in &rows {
        match record_from_row(row) {
            Some(record) => result.records.push(record),
            None => result.invalid += 1,
        }
    }
    debug!(
        "Read {} rows from {} ({} invalid)",
        result.total(),
        path.display(),
        result.invalid
    );
    Ok(result)
}

/// Check that a file holds rows with every required field
///
/// Fails when the file cannot be read, holds no rows, or no row carries an
/// id, creation time and text.
pub fn validate_file(path: impl AsRef<Path>) -> Result<ValidationReport> {
    let contents = read_export(path)?;
    let total = contents.total();
    if total == 0 {
        return Err(Error::export("File contains no tweets"));
    }

    let valid = contents.records.iter().filter(|r| is_importable(r)).count();
    if valid == 0 {
        return Err(Error::export(format!(
            "Found {total} records but none have required fields"
        )));
    }
    Ok(ValidationReport { valid, total })
}

/// Whether a record carries every field the store requires
pub fn is_importable(record: &CanonicalRecord) -> bool {
    !record.id.is_empty()
        && !record.text.trim().is_empty()
        && record
            .created_at
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
}

fn parse_jsonl(contents: &str) -> Result<Vec<JsonValue>> {
    let mut rows = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: JsonValue = serde_json::from_str(line)
            .map_err(|e| Error::export(format!("Invalid JSON on line {}: {e}", index + 1)))?;
        if value.is_object() {
            rows.push(value);
        }
    }
    Ok(rows)
}

fn parse_json(contents: &str) -> Result<Vec<JsonValue>> {
    let value: JsonValue = serde_json::from_str(contents)
        .map_err(|e| Error::export(format!("Invalid JSON file: {e}")))?;

    let rows = match value {
        JsonValue::Array(items) => items,
        JsonValue::Object(mut map) => match map.remove("tweets") {
            Some(JsonValue::Array(items)) => items,
            Some(other) => {
                map.insert("tweets".to_string(), other);
                vec![JsonValue::Object(map)]
            }
            None => vec![JsonValue::Object(map)],
        },
        _ => return Err(Error::export("JSON must be an array or object")),
    };
    Ok(rows.into_iter().filter(JsonValue::is_object).collect())
}

/// Resolve one row into a record; `None` without an id or text
fn record_from_row(row: &JsonValue) -> Option<CanonicalRecord> {
    let id = ID
        .first_str(row)
        .map(str::to_string)
        .or_else(|| ID.first_int(row).map(|n| n.to_string()))?;
    let text = TEXT.first_str(row).map(str::trim).filter(|t| !t.is_empty())?;

    let mut record = CanonicalRecord::new(id, text);
    record.created_at = CREATED_AT.first_str(row).map(str::to_string);
    record.permalink = URL.first_str(row).map(str::to_string);
    record.source_tag = SOURCE.first_str(row).unwrap_or(SOURCE_TAG).to_string();
    record.language = LANG.first_str(row).map(str::to_string);
    record.author_handle = AUTHOR.first_str(row).map(str::to_string);
    record.conversation_id = CONVERSATION.first_str(row).map(str::to_string);
    record.is_retweet = IS_RETWEET.any_present(row);
    record.is_reply = IS_REPLY.any_present(row);
    record.is_quote = IS_QUOTE.any_present(row);
    record.is_mention = IS_MENTION.any_present(row);
    record.metrics = metrics_from_row(row);
    record.raw_payload = row.get("raw").filter(|raw| !raw.is_null()).cloned();
    Some(record)
}

fn metrics_from_row(row: &JsonValue) -> Metrics {
    let source = ["metrics", "public_metrics"]
        .iter()
        .filter_map(|key| row.get(*key))
        .find(|value| value.as_object().is_some_and(|m| !m.is_empty()))
        .unwrap_or(row);

    Metrics {
        likes: LIKES.first_int(source),
        retweets: RETWEETS.first_int(source),
        replies: REPLIES.first_int(source),
        quotes: QUOTES.first_int(source),
        views: VIEWS.first_int(source),
    }
}
