//! Response normalizer module
//!
//! Walks arbitrarily nested GraphQL timeline responses and turns every
//! embedded item into a `CanonicalRecord`, independently locating the cursor
//! of the next page.
//!
//! # Overview
//!
//! - Record discovery treats any object with a numeric id and either a
//!   `__typename: "Tweet"` marker or a nested `legacy` object as a candidate,
//!   including records wrapped under `*_results.result`
//! - Field values come from ordered path tables (see `paths`), first usable
//!   value wins
//! - Deduplication by id is local to a single response

mod extract;
pub mod paths;
mod types;

pub use extract::{extract_records, extract_records_and_cursor, find_cursor, normalize_timestamp};
pub use types::{
    CanonicalRecord, CursorRole, ExtractOptions, Extraction, Metrics, SOURCE_TAG,
};
