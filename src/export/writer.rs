//! JSONL export writer
//!
//! One compact JSON object per line, in record order.

use super::types::ExportKind;
use crate::error::{Error, Result};
use crate::normalize::CanonicalRecord;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Timestamp layout of export filenames (no colons)
const FILENAME_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%SZ";

/// Build `<handle>_<kind>_<UTC timestamp>.jsonl`
///
/// A leading `@` is dropped and any character outside `[A-Za-z0-9_]` becomes
/// `_`; an empty handle is written as `unknown`.
pub fn export_filename(handle: &str, kind: ExportKind, now: DateTime<Utc>) -> String {
    let cleaned: String = handle
        .trim()
        .trim_start_matches('@')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let handle = if cleaned.is_empty() { "unknown" } else { cleaned.as_str() };

    format!(
        "{handle}_{kind}_{}.jsonl",
        now.format(FILENAME_TIME_FORMAT)
    )
}

/// Records belonging in an export of the given kind
pub fn select_for_export(records: &[CanonicalRecord], kind: ExportKind) -> Vec<&CanonicalRecord> {
    records
        .iter()
        .filter(|record| kind.includes_replies() || !record.is_reply)
        .collect()
}

/// Serialize records to JSONL text
pub fn to_jsonl<'a>(records: impl IntoIterator<Item = &'a CanonicalRecord>) -> Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Write records as JSONL, creating parent directories; returns the line count
pub fn write_jsonl<'a>(
    path: impl AsRef<Path>,
    records: impl IntoIterator<Item = &'a CanonicalRecord>,
) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)
        .map_err(|e| Error::export(format!("Failed to create {}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    let mut written = 0;
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;

    Ok(written)
}

/// Write a run's records into `dir` under the standard filename
pub fn export_records(
    dir: impl AsRef<Path>,
    handle: &str,
    records: &[CanonicalRecord],
    kind: ExportKind,
    now: DateTime<Utc>,
) -> Result<(PathBuf, usize)> {
    let path = dir.as_ref().join(export_filename(handle, kind, now));
    let written = write_jsonl(&path, select_for_export(records, kind))?;
    info!("Exported {written} records to {}", path.display());
    Ok((path, written))
}
