//! Timeline payload builders shared by unit tests

use serde_json::{json, Value};

/// A `Tweet` result as returned inside `tweet_results.result`
pub fn tweet(id: &str, text: &str) -> Value {
    json!({
        "__typename": "Tweet",
        "rest_id": id,
        "core": {
            "user_results": {
                "result": {
                    "__typename": "User",
                    "rest_id": "44196397",
                    "legacy": {"screen_name": "alice", "name": "Alice"}
                }
            }
        },
        "views": {"count": "1500", "state": "EnabledWithCount"},
        "legacy": {
            "id_str": id,
            "full_text": text,
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
            "favorite_count": 10,
            "retweet_count": 2,
            "reply_count": 1,
            "quote_count": 0,
            "conversation_id_str": id,
            "lang": "en",
            "is_quote_status": false,
            "entities": {"hashtags": [], "user_mentions": []}
        }
    })
}

/// A tweet with a specific view count
pub fn tweet_with_views(id: &str, text: &str, views: i64) -> Value {
    let mut value = tweet(id, text);
    value["views"]["count"] = json!(views.to_string());
    value
}

/// A `UserTweets` response with the given results and optional bottom cursor
pub fn timeline_page(results: Vec<Value>, bottom_cursor: Option<&str>) -> Value {
    let mut entries: Vec<Value> = results
        .into_iter()
        .enumerate()
        .map(|(i, result)| {
            json!({
                "entryId": format!("tweet-{i}"),
                "sortIndex": format!("{}", 1000 - i),
                "content": {
                    "entryType": "TimelineTimelineItem",
                    "__typename": "TimelineTimelineItem",
                    "itemContent": {
                        "itemType": "TimelineTweet",
                        "__typename": "TimelineTweet",
                        "tweet_results": {"result": result}
                    }
                }
            })
        })
        .collect();

    entries.push(json!({
        "entryId": "cursor-top-1",
        "content": {
            "entryType": "TimelineTimelineCursor",
            "__typename": "TimelineTimelineCursor",
            "value": "TOP-CURSOR",
            "cursorType": "Top"
        }
    }));
    if let Some(cursor) = bottom_cursor {
        entries.push(json!({
            "entryId": "cursor-bottom-1",
            "content": {
                "entryType": "TimelineTimelineCursor",
                "__typename": "TimelineTimelineCursor",
                "value": cursor,
                "cursorType": "Bottom"
            }
        }));
    }

    json!({
        "data": {
            "user": {
                "result": {
                    "__typename": "User",
                    "timeline_v2": {
                        "timeline": {
                            "instructions": [
                                {"type": "TimelineClearCache"},
                                {"type": "TimelineAddEntries", "entries": entries}
                            ]
                        }
                    }
                }
            }
        }
    })
}
