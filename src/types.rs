//! Common types used throughout TweetDNA Harvest
//!
//! Shared type aliases and small helpers used across multiple modules.

use serde_json::Value;
use std::collections::BTreeMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Ordered string map (header maps, query parameters)
pub type StringMap = BTreeMap<String, String>;

// ============================================================================
// JSON Path Helpers
// ============================================================================

/// Follow a key path through nested JSON objects
///
/// Returns `None` as soon as a segment is missing or a non-object is hit.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        match current {
            Value::Object(map) => current = map.get(*part)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Follow a key path and return a non-empty string
pub fn lookup_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    lookup(value, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Current wall-clock time as milliseconds since the Unix epoch
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested() {
        let value = json!({"a": {"b": {"c": 3}}});
        assert_eq!(lookup(&value, &["a", "b", "c"]), Some(&json!(3)));
        assert_eq!(lookup(&value, &["a", "x"]), None);
        assert_eq!(lookup(&value, &["a", "b", "c", "d"]), None);
        assert_eq!(lookup(&value, &[]), Some(&value));
    }

    #[test]
    fn test_lookup_str_skips_empty() {
        let value = json!({"full": "hello", "empty": "", "num": 1});
        assert_eq!(lookup_str(&value, &["full"]), Some("hello"));
        assert_eq!(lookup_str(&value, &["empty"]), None);
        assert_eq!(lookup_str(&value, &["num"]), None);
    }
}
