//! Export and import of harvested records
//!
//! # Overview
//!
//! - `write_jsonl` / `export_records` - JSONL files named
//!   `<handle>_<kind>_<YYYY-MM-DDTHH-MM-SSZ>.jsonl`
//! - `read_export` / `validate_file` - Tolerant reader for JSONL and JSON
//! - `RecordStore` - Idempotent upsert-by-id sink, with `MemoryStore`

mod reader;
mod store;
mod types;
mod writer;

pub use reader::{is_importable, read_export, validate_file, ExportContents};
pub use store::{import_file, MemoryStore, RecordStore};
pub use types::{ExportKind, ImportStats, ValidationReport};
pub use writer::{export_filename, export_records, select_for_export, to_jsonl, write_jsonl};
