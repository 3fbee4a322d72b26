// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # TweetDNA Harvest
//!
//! Reuses an authenticated timeline request observed in live traffic to page
//! through a user's timeline, normalizing each tweet into a flat record and
//! exporting the result as JSONL.
//!
//! ## Features
//!
//! - **Passive capture**: Keep the latest `UserTweets` GraphQL request as a template
//! - **Replay**: Rebuild the request for any subject and cursor
//! - **Normalization**: Flatten deeply nested timeline payloads into canonical records
//! - **Pagination**: Cursor-following engine with dedup, filters, backoff and stop
//! - **Relay**: Command/event protocol between a controller and the engine
//! - **Export**: JSONL writer, multi-format reader and idempotent import
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tweetdna_harvest::capture::{load_har, TemplateStore};
//! use tweetdna_harvest::engine::{PaginationEngine, RunConfig};
//! use tweetdna_harvest::http::HttpClient;
//! use tweetdna_harvest::relay::Relay;
//!
//! #[tokio::main]
//! async fn main() -> tweetdna_harvest::Result<()> {
//!     let store = TemplateStore::new();
//!     load_har(&store, "session.har").await?;
//!
//!     let engine = PaginationEngine::new(HttpClient::new()?);
//!     let relay = Relay::spawn(engine, store);
//!
//!     let mut events = relay.subscribe();
//!     relay.start(RunConfig::new("44196397")).await?;
//!     while let Ok(event) = events.recv().await {
//!         if event.is_terminal() {
//!             break;
//!         }
//!     }
//!     let records = relay.snapshot().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    Controller (CLI / HTTP + SSE)                  │
//! │   start · stop · getData · reset    ⇄    progress · done · error │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │ relay
//! ┌───────────┬───────────┬───────┴───────┬─────────────┬────────────┐
//! │  Capture  │  Request  │    Engine     │  Normalize  │   Export   │
//! ├───────────┼───────────┼───────────────┼─────────────┼────────────┤
//! │ Observe   │ Overrides │ Cursor loop   │ Entries     │ JSONL      │
//! │ HAR       │ Variables │ Dedup/filter  │ Metrics     │ Reader     │
//! │ Persist   │ URL build │ 429 backoff   │ Flags       │ Import     │
//! └───────────┴───────────┴───────────────┴─────────────┴────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Request template capture
pub mod capture;

/// Request building from a captured template
pub mod request;

/// Timeline response normalization
pub mod normalize;

/// HTTP client with timeout and optional pacing
pub mod http;

/// Pagination engine
pub mod engine;

/// Controller/engine relay protocol
pub mod relay;

/// JSONL export, import and validation
pub mod export;

/// Application configuration
pub mod config;

/// Command-line interface
pub mod cli;

#[cfg(test)]
pub(crate) mod fixtures;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use capture::{CapturedTemplate, TemplateStore};
pub use engine::{PaginationEngine, RunConfig};
pub use normalize::CanonicalRecord;
pub use relay::{Relay, RelayCommand, RelayEvent, RelayHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
